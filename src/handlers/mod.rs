pub mod account;
pub mod article;
pub mod auth;
pub mod category;
pub mod checkout;
pub mod comment;
pub mod contact;
pub mod like;
