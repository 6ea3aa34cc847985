//! Route paths.

pub const POST_USERS_REGISTER: &str = "/api/v1/users/register";
pub const POST_USERS_LOGIN: &str = "/api/v1/users/login";
pub const POST_USERS_LOGOUT: &str = "/api/v1/users/logout";
pub const POST_USERS_REFRESH_TOKEN: &str = "/api/v1/users/refresh-token";
pub const POST_USERS_CHANGE_PASSWORD: &str = "/api/v1/users/change-password";
pub const GET_USERS_CURRENT_USER: &str = "/api/v1/users/current-user";
pub const PATCH_USERS_UPDATE_ACCOUNT: &str = "/api/v1/users/update-account";
