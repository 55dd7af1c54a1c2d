//! Error types for the scoped console.
//!
//! Three families of errors exist:
//! - [`DefinitionError`]: a command or converter is declared incorrectly.
//!   Raised while loading modules (and by a buggy converter at execution
//!   time); the offending declaration is skipped.
//! - [`UserError`]: the person typing the command made a mistake. Reported to
//!   the console log, never past the executor.
//! - [`ConsoleError`]: application-level failures (configuration, runtime,
//!   and unhandled command failures in debug configurations).

use thiserror::Error;

/// Main error type for console operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Configuration errors (invalid config file, bad override values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input handed to the execution interface.
    #[error("Input error: {0}")]
    Input(String),

    /// Runtime errors (no async runtime, I/O on the terminal, etc.)
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// A command failed in a way that is neither a definition nor a user
    /// error. Only surfaced when the console runs in debug mode.
    #[error("Unhandled error attempting to execute command '{command}': {message}")]
    Unhandled { command: String, message: String },
}

impl ConsoleError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an input error with the given message.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates a runtime error with the given message.
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Creates an unhandled command error.
    pub fn unhandled(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unhandled {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Input(_) => "Input Error",
            Self::Runtime(_) => "Runtime Error",
            Self::Unhandled { .. } => "Unhandled Error",
        }
    }
}

/// Result type alias using ConsoleError.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// A command or converter declaration that cannot be loaded or used.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Console command name cannot be empty")]
    EmptyName,

    #[error("Console command name cannot contain spaces")]
    NameContainsSpace,

    #[error("Console command name cannot contain periods")]
    NameContainsPeriod,

    #[error("Console command name cannot start with the character {0}")]
    NameStartsWithEscape(char),

    #[error("Console commands declared on the generic scope {owner} are not supported. Declare the command on a concrete scope type instead")]
    GenericScope { owner: String },

    #[error("Global console commands declared inside the generic scope {owner} are not supported. Is there a way to define the command in a non-generic scope?")]
    GlobalInGenericScope { owner: String },

    #[error("No parameter converter is defined for the parameter type {0}")]
    NoConverter(String),

    #[error("The default value of parameter {parameter} is a {actual}, but the parameter is declared as {expected}")]
    DefaultTypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    #[error("Multiple console commands use the name '{name}' in the same scope\n'{name}' at {existing}\nand '{name}' at {duplicate}")]
    DuplicateCommand {
        name: String,
        existing: String,
        duplicate: String,
    },

    #[error("Multiple parameter converters are registered for the type {ty} ({existing} and {competing})")]
    CompetingConverters {
        ty: String,
        existing: String,
        competing: String,
    },

    #[error("The parameter converter {converter} produces {declared} values but is registered for {expected}")]
    ConverterContract {
        converter: String,
        declared: String,
        expected: String,
    },

    #[error("The parameter converter {0} cannot be constructed without configuration")]
    ConverterNotConstructible(String),

    #[error("The parameter converter '{converter}' returned an unexpected type (expected '{expected}' but returned '{actual}')")]
    ConverterReturnedWrongType {
        converter: String,
        expected: String,
        actual: String,
    },

    #[error("Command '{command}' was invoked with a {actual} scope, expected {expected}")]
    ScopeMismatch {
        command: String,
        expected: String,
        actual: String,
    },
}

/// A mistake in the input typed by the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserError {
    #[error("'{0}' is not a valid command")]
    NotACommand(String),

    #[error(
        "Command '{command}' requires at least {required} parameter{plural}: {list}",
        plural = plural_suffix(.required),
        list = join_parameter_names(.names)
    )]
    InsufficientParameters {
        command: String,
        required: usize,
        names: Vec<String>,
    },

    #[error("Could not parse parameter {parameter} - {parameter} must be a valid {expected}")]
    ParameterParse { parameter: String, expected: String },

    /// Raised by command bodies for failures the user can fix.
    #[error("{0}")]
    Rejected(String),
}

impl UserError {
    /// Creates a user-facing rejection from inside a command body.
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }
}

fn plural_suffix(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

/// Joins parameter names as `[A], [B] and [C]`.
fn join_parameter_names(names: &[String]) -> String {
    let mut output = String::new();
    for (i, name) in names.iter().enumerate() {
        output.push('[');
        output.push_str(name);
        output.push(']');
        if i + 2 < names.len() {
            output.push_str(", ");
        } else if i + 2 == names.len() {
            output.push_str(" and ");
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = ConsoleError::config("escape_chars cannot contain '.'");
        assert_eq!(
            err.to_string(),
            "Configuration error: escape_chars cannot contain '.'"
        );
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_error_display_unhandled() {
        let err = ConsoleError::unhandled("explode", "boom");
        assert_eq!(
            err.to_string(),
            "Unhandled error attempting to execute command 'explode': boom"
        );
        assert_eq!(err.category(), "Unhandled Error");
    }

    #[test]
    fn test_error_categories() {
        let categories: Vec<&str> = [
            ConsoleError::config("a"),
            ConsoleError::input("b"),
            ConsoleError::runtime("c"),
            ConsoleError::unhandled("d", "e"),
        ]
        .iter()
        .map(ConsoleError::category)
        .collect();
        assert_eq!(
            categories,
            vec![
                "Configuration Error",
                "Input Error",
                "Runtime Error",
                "Unhandled Error"
            ]
        );
    }

    #[test]
    fn test_insufficient_parameters_two_names() {
        let err = UserError::InsufficientParameters {
            command: "greet".to_string(),
            required: 2,
            names: vec!["First".to_string(), "Second".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Command 'greet' requires at least 2 parameters: [First] and [Second]"
        );
    }

    #[test]
    fn test_insufficient_parameters_single_and_many() {
        let one = UserError::InsufficientParameters {
            command: "echo".to_string(),
            required: 1,
            names: vec!["Text".to_string()],
        };
        assert_eq!(
            one.to_string(),
            "Command 'echo' requires at least 1 parameter: [Text]"
        );

        let three = UserError::InsufficientParameters {
            command: "move".to_string(),
            required: 3,
            names: vec!["X".to_string(), "Y".to_string(), "Z".to_string()],
        };
        assert_eq!(
            three.to_string(),
            "Command 'move' requires at least 3 parameters: [X], [Y] and [Z]"
        );
    }

    #[test]
    fn test_parameter_parse_message() {
        let err = UserError::ParameterParse {
            parameter: "Enabled".to_string(),
            expected: "bool".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Could not parse parameter Enabled - Enabled must be a valid bool"
        );
    }

    #[test]
    fn test_duplicate_command_names_both_sites() {
        let err = DefinitionError::DuplicateCommand {
            name: "foo".to_string(),
            existing: "alpha (src/a.rs:1)".to_string(),
            duplicate: "beta (src/b.rs:2)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("alpha (src/a.rs:1)"));
        assert!(msg.contains("beta (src/b.rs:2)"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConsoleError>();
        assert_send_sync::<DefinitionError>();
        assert_send_sync::<UserError>();
    }
}
