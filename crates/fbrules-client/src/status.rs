//! Per-service tables mapping HTTP status codes to error messages.

use crate::error::TransportError;

/// Status-code to message table for one backend service.
#[derive(Debug, Clone, Copy)]
pub struct ErrorCodes {
    entries: &'static [(u16, &'static str)],
}

impl ErrorCodes {
    pub const fn new(entries: &'static [(u16, &'static str)]) -> Self {
        Self { entries }
    }

    /// Message for `status`, if the table maps it.
    pub fn lookup(&self, status: u16) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(code, _)| *code == status)
            .map(|(_, message)| *message)
    }

    /// Human-readable description of a transport failure.
    ///
    /// Mapped statuses use the table entry, unmapped statuses render as
    /// `Error {status}.`, and failures without a response use the error text.
    pub fn describe(&self, error: &TransportError) -> String {
        match error.status() {
            Some(status) => match self.lookup(status) {
                Some(message) => message.to_string(),
                None => format!("Error {}.", status),
            },
            None => error.to_string(),
        }
    }
}

/// Realtime Database rules endpoint.
pub const DATABASE_RULES_ERRORS: ErrorCodes = ErrorCodes::new(&[
    (400, "Invalid argument provided."),
    (401, "Request not authorized."),
    (403, "Client does not have sufficient privileges."),
    (404, "The specified entity could not be found."),
    (409, "The specified entity already exists."),
    (423, "The database has been manually locked by an owner."),
    (500, "Internal server error."),
    (503, "The server could not process the request in time."),
]);

/// Firebase Rules API.
pub const FIREBASE_RULES_ERRORS: ErrorCodes = ErrorCodes::new(&[
    (400, "Invalid argument provided."),
    (401, "Request not authorized."),
    (403, "Client does not have sufficient privileges."),
    (404, "The specified entity could not be found."),
    (409, "The specified entity already exists."),
    (429, "Quota exceeded for the requested resource."),
    (500, "Internal server error."),
    (503, "The server could not process the request in time."),
]);

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16) -> TransportError {
        TransportError::Status {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_tables_differ_on_423_and_429() {
        assert_eq!(
            DATABASE_RULES_ERRORS.lookup(423),
            Some("The database has been manually locked by an owner.")
        );
        assert_eq!(DATABASE_RULES_ERRORS.lookup(429), None);
        assert_eq!(
            FIREBASE_RULES_ERRORS.lookup(429),
            Some("Quota exceeded for the requested resource.")
        );
        assert_eq!(FIREBASE_RULES_ERRORS.lookup(423), None);
    }

    #[test]
    fn test_shared_entries() {
        for table in [DATABASE_RULES_ERRORS, FIREBASE_RULES_ERRORS] {
            assert_eq!(table.lookup(400), Some("Invalid argument provided."));
            assert_eq!(table.lookup(401), Some("Request not authorized."));
            assert_eq!(
                table.lookup(403),
                Some("Client does not have sufficient privileges.")
            );
            assert_eq!(
                table.lookup(404),
                Some("The specified entity could not be found.")
            );
            assert_eq!(
                table.lookup(409),
                Some("The specified entity already exists.")
            );
            assert_eq!(table.lookup(500), Some("Internal server error."));
            assert_eq!(
                table.lookup(503),
                Some("The server could not process the request in time.")
            );
        }
    }

    #[test]
    fn test_describe_unmapped_status() {
        assert_eq!(FIREBASE_RULES_ERRORS.describe(&status_error(418)), "Error 418.");
        assert_eq!(DATABASE_RULES_ERRORS.describe(&status_error(502)), "Error 502.");
    }

    #[test]
    fn test_describe_without_response() {
        let err = TransportError::auth("no token");
        assert_eq!(
            FIREBASE_RULES_ERRORS.describe(&err),
            "Authentication failed: no token"
        );
    }
}
