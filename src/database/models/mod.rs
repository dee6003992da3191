pub mod principal;

pub use principal::{NewPrincipal, Principal, PrincipalRow, Role};
