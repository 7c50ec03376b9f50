use chrono::NaiveDateTime;
use diesel::mysql::Mysql;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel::sql_types::{Bigint, Text, Unsigned};

use crate::models::{Food, FoodCategory, FoodChangeset, NewFood, NewFoodCategory};
use crate::schema;

no_arg_sql_function!(
    last_insert_id,
    Unsigned<Bigint>,
    "Id generated by the last INSERT on this connection"
);

sql_function!(fn lower(x: Text) -> Text);

const LIKE_ESCAPE: char = '\\';

pub(crate) fn find_session(
    token_hash: &str,
    now: NaiveDateTime,
    conn: &MysqlConnection,
) -> QueryResult<Option<(i32, Vec<String>)>> {
    use crate::schema::personal_access_tokens::dsl::*;
    use crate::schema::{role_user, roles};

    let owner = personal_access_tokens
        .filter(token.eq(token_hash))
        .select(user_id)
        .first::<i32>(conn)
        .optional()?;
    let owner = match owner {
        Some(owner) => owner,
        None => return Ok(None),
    };

    diesel::update(personal_access_tokens.filter(token.eq(token_hash)))
        .set(last_used_at.eq(Some(now)))
        .execute(conn)?;

    let role_names = role_user::table
        .inner_join(roles::table)
        .filter(role_user::user_id.eq(owner))
        .select(roles::name)
        .order(roles::name.asc())
        .load::<String>(conn)?;
    Ok(Some((owner, role_names)))
}

pub(crate) fn find_all_foods(conn: &MysqlConnection) -> QueryResult<Vec<Food>> {
    use crate::schema::foods::dsl::*;

    foods.order(id.asc()).load::<Food>(conn)
}

pub(crate) fn find_food(food_id: i32, conn: &MysqlConnection) -> QueryResult<Option<Food>> {
    use crate::schema::foods::dsl::*;

    foods.find(food_id).first::<Food>(conn).optional()
}

pub(crate) fn search_foods(fragment: &str, conn: &MysqlConnection) -> QueryResult<Vec<Food>> {
    search_query(fragment).load::<Food>(conn)
}

fn search_query(fragment: &str) -> schema::foods::BoxedQuery<'static, Mysql> {
    use crate::schema::foods::dsl::*;

    let pattern = format!("%{}%", escape_like(&fragment.to_lowercase()));
    foods
        .filter(lower(name).like(pattern).escape(LIKE_ESCAPE))
        .order(id.asc())
        .into_boxed()
}

pub(crate) fn insert_food(new_food: &NewFood, conn: &MysqlConnection) -> QueryResult<Food> {
    use crate::schema::foods::dsl::*;

    conn.transaction::<_, DieselError, _>(|| {
        diesel::insert_into(foods).values(new_food).execute(conn)?;
        let new_id = inserted_id(conn)?;
        foods.find(new_id).first::<Food>(conn)
    })
}

pub(crate) fn update_food(
    food_id: i32,
    changes: &FoodChangeset,
    conn: &MysqlConnection,
) -> QueryResult<Option<Food>> {
    use crate::schema::foods::dsl::*;

    conn.transaction::<_, DieselError, _>(|| {
        if !changes.is_noop() {
            diesel::update(foods.find(food_id)).set(changes).execute(conn)?;
        }
        foods.find(food_id).first::<Food>(conn).optional()
    })
}

pub(crate) fn delete_food(food_id: i32, conn: &MysqlConnection) -> QueryResult<bool> {
    use crate::schema::foods::dsl::*;

    let deleted = diesel::delete(foods.find(food_id)).execute(conn)?;
    Ok(deleted > 0)
}

pub(crate) fn category_exists(category_id: i32, conn: &MysqlConnection) -> QueryResult<bool> {
    use crate::schema::food_categories::dsl::*;

    diesel::select(diesel::dsl::exists(food_categories.find(category_id))).get_result(conn)
}

pub(crate) fn find_all_categories(conn: &MysqlConnection) -> QueryResult<Vec<FoodCategory>> {
    use crate::schema::food_categories::dsl::*;

    food_categories.order(id.asc()).load::<FoodCategory>(conn)
}

pub(crate) fn insert_category(
    category: &NewFoodCategory,
    conn: &MysqlConnection,
) -> QueryResult<FoodCategory> {
    use crate::schema::food_categories::dsl::*;

    conn.transaction::<_, DieselError, _>(|| {
        diesel::insert_into(food_categories)
            .values(category)
            .execute(conn)?;
        let new_id = inserted_id(conn)?;
        food_categories.find(new_id).first::<FoodCategory>(conn)
    })
}

fn inserted_id(conn: &MysqlConnection) -> QueryResult<i32> {
    let raw: u64 = diesel::select(last_insert_id).first(conn)?;
    i32::try_from(raw).map_err(|e| DieselError::DeserializationError(Box::new(e)))
}

pub(crate) fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use diesel::mysql::Mysql;

    use super::{escape_like, search_query};

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("rice"), "rice");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn search_binds_an_escaped_lowercase_pattern() {
        let sql = diesel::debug_query::<Mysql, _>(&search_query("50%_Off")).to_string();

        assert!(sql.contains("lower(`foods`.`name`) LIKE ? ESCAPE ?"), "{}", sql);
        assert!(sql.contains("ORDER BY `foods`.`id` ASC"), "{}", sql);
        assert!(sql.contains(&format!("{:?}", "%50\\%\\_off%")), "{}", sql);
        assert!(!sql.contains("50%_Off"), "{}", sql);
    }
}
