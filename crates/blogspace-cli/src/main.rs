mod cli;

use blogspace_core::{ApiError, ApiErrorKind};

const SESSION_EXPIRED_HINT: &str = "Session expired. Run `blogspace login` to sign in again.";

fn main() {
    if let Err(e) = cli::run() {
        if e
            .downcast_ref::<ApiError>()
            .is_some_and(|err| err.kind == ApiErrorKind::AuthorizationExpired)
        {
            eprintln!("{SESSION_EXPIRED_HINT}");
            std::process::exit(1);
        }
        eprintln!("{e:#}"); // pretty anyhow chain
        std::process::exit(1);
    }
}
