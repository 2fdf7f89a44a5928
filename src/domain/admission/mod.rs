//! Admission domain - bounds how many sessions run concurrently

mod admission_controller;

pub use admission_controller::AdmissionController;
