pub mod ca;
pub mod certificate;
pub mod enrollment;

pub use ca::{CaClient, CaError, EnrollmentRequest, InMemoryCa, RegistrationRequest};
pub use certificate::{Certificate, IdentityRole};
pub use enrollment::{EnrollOutcome, EnrollmentError, enroll_admin, register_and_enroll_user};
