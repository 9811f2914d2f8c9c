pub mod currency;
pub mod numeric;
pub mod reference;
pub mod spread;
