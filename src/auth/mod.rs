pub mod jwt;

pub use jwt::authenticate;
