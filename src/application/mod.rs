pub mod interfaces;
pub mod usecases;
