pub mod jwt;
pub mod pagination;
pub mod security;
pub mod signing;
pub mod slug;
