table! {
    food_categories (id) {
        id -> Integer,
        name -> Varchar,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    foods (id) {
        id -> Integer,
        name -> Varchar,
        source -> Varchar,
        category_id -> Integer,
        water -> Double,
        energy -> Double,
        protein -> Double,
        fat -> Double,
        carbohydrate -> Double,
        fiber -> Double,
        ash -> Double,
        calcium -> Double,
        phosphorus -> Double,
        iron -> Double,
        sodium -> Double,
        potassium -> Double,
        copper -> Double,
        zinc -> Double,
        retinol -> Double,
        beta_carotene -> Double,
        total_carotene -> Double,
        thiamine -> Double,
        riboflavin -> Double,
        niacin -> Double,
        vitamin_c -> Double,
        edible_portion -> Double,
        created_at -> Datetime,
        updated_at -> Datetime,
    }
}

table! {
    personal_access_tokens (id) {
        id -> Integer,
        user_id -> Integer,
        token -> Varchar,
        last_used_at -> Nullable<Datetime>,
        created_at -> Datetime,
    }
}

table! {
    role_user (user_id, role_id) {
        user_id -> Integer,
        role_id -> Integer,
    }
}

table! {
    roles (id) {
        id -> Integer,
        name -> Varchar,
        display_name -> Varchar,
        description -> Nullable<Varchar>,
    }
}

table! {
    users (id) {
        id -> Integer,
        name -> Varchar,
        email -> Varchar,
    }
}

joinable!(foods -> food_categories (category_id));
joinable!(personal_access_tokens -> users (user_id));
joinable!(role_user -> roles (role_id));
joinable!(role_user -> users (user_id));

allow_tables_to_appear_in_same_query!(
    food_categories,
    foods,
    personal_access_tokens,
    role_user,
    roles,
    users,
);
