//! Authentication state management
//!
//! The [`TokenManager`] owns the persisted token state and drives the
//! refresh call; the retry coordinator consults it when authorization
//! failures arrive.

mod token_manager;

pub use token_manager::{
    TokenManager, TokenRefreshResponse, HEADER_ACCESS_TOKEN, HEADER_EXPIRES_IN,
    HEADER_REFRESH_TOKEN, REFRESH_TOKEN_PATH,
};
