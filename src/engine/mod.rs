pub mod amounts;
pub mod desk;
pub mod rates;
pub mod risk;
pub mod script;
