pub mod intake;
pub mod screening;
