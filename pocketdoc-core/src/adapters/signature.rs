//! Routine signature synthesis.
//!
//! Signatures are rebuilt from argument metadata only; routine bodies are
//! never read. The rendered form is
//! `<TYPE> <name>(<argname> <mode> <datatype>, ...)`, with
//! ` RETURNS <type>` appended for functions.

use crate::models::{RoutineArgument, RoutineType};

/// Return type rendered when a dialect could not resolve a function's
/// concrete return type.
pub const UNRESOLVED_RETURN_TYPE: &str = "<unresolved>";

/// Builds the display signature of a routine.
///
/// Arguments are ordered by catalog position. Empty components (for
/// instance unnamed PostgreSQL arguments) are left out of the argument text.
///
/// # Example
/// ```rust
/// use pocketdoc_core::adapters::signature::build_signature;
/// use pocketdoc_core::models::{ArgumentMode, RoutineArgument, RoutineType};
///
/// let args = vec![RoutineArgument {
///     name: "EMP_ID".to_string(),
///     position: 1,
///     mode: ArgumentMode::In,
///     data_type: "NUMBER".to_string(),
///     default_value: None,
///     comment: None,
/// }];
/// let signature = build_signature(RoutineType::Function, "GET_NAME", &args, Some("VARCHAR2"));
/// assert_eq!(signature, "FUNCTION GET_NAME(EMP_ID IN NUMBER) RETURNS VARCHAR2");
/// ```
pub fn build_signature(
    routine_type: RoutineType,
    name: &str,
    arguments: &[RoutineArgument],
    return_type: Option<&str>,
) -> String {
    let mut ordered: Vec<&RoutineArgument> = arguments.iter().collect();
    ordered.sort_by_key(|arg| arg.position);

    let rendered: Vec<String> = ordered
        .iter()
        .map(|arg| {
            [arg.name.as_str(), arg.mode.as_str(), arg.data_type.as_str()]
                .iter()
                .filter(|part| !part.trim().is_empty())
                .copied()
                .collect::<Vec<&str>>()
                .join(" ")
        })
        .collect();

    let mut signature = format!("{} {}({})", routine_type, name, rendered.join(", "));
    if routine_type == RoutineType::Function {
        let resolved = return_type
            .map(str::trim)
            .filter(|rt| !rt.is_empty())
            .unwrap_or(UNRESOLVED_RETURN_TYPE);
        signature.push_str(" RETURNS ");
        signature.push_str(resolved);
    }
    signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArgumentMode;

    fn arg(name: &str, position: i32, mode: ArgumentMode, data_type: &str) -> RoutineArgument {
        RoutineArgument {
            name: name.to_string(),
            position,
            mode,
            data_type: data_type.to_string(),
            default_value: None,
            comment: None,
        }
    }

    #[test]
    fn test_raise_salary_procedure() {
        let args = vec![
            arg("EMP_ID", 1, ArgumentMode::In, "NUMBER"),
            arg("PCT", 2, ArgumentMode::In, "NUMBER"),
        ];
        assert_eq!(
            build_signature(RoutineType::Procedure, "RAISE_SALARY", &args, None),
            "PROCEDURE RAISE_SALARY(EMP_ID IN NUMBER, PCT IN NUMBER)"
        );
    }

    #[test]
    fn test_arguments_sorted_by_position() {
        let args = vec![
            arg("b", 2, ArgumentMode::Out, "integer"),
            arg("a", 1, ArgumentMode::InOut, "text"),
        ];
        assert_eq!(
            build_signature(RoutineType::Procedure, "swap", &args, None),
            "PROCEDURE swap(a INOUT text, b OUT integer)"
        );
    }

    #[test]
    fn test_function_return_type_and_placeholder() {
        assert_eq!(
            build_signature(RoutineType::Function, "now_utc", &[], Some("timestamp")),
            "FUNCTION now_utc() RETURNS timestamp"
        );
        assert_eq!(
            build_signature(RoutineType::Function, "mystery", &[], None),
            "FUNCTION mystery() RETURNS <unresolved>"
        );
        assert_eq!(
            build_signature(RoutineType::Function, "blank", &[], Some("  ")),
            "FUNCTION blank() RETURNS <unresolved>"
        );
    }

    #[test]
    fn test_unnamed_argument_skips_empty_name() {
        let args = vec![arg("", 1, ArgumentMode::In, "integer")];
        assert_eq!(
            build_signature(RoutineType::Function, "inc", &args, Some("integer")),
            "FUNCTION inc(IN integer) RETURNS integer"
        );
    }

    #[test]
    fn test_procedure_never_has_returns_clause() {
        let signature = build_signature(RoutineType::Procedure, "p", &[], Some("integer"));
        assert_eq!(signature, "PROCEDURE p()");
    }
}
