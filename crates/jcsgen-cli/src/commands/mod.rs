pub(crate) mod enumerate;
pub(crate) mod generate;
