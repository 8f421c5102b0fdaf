/// Error code registry for Botflow
///
/// Error codes are organized by category:
/// - 1000-1999: Format errors (malformed templates and targets)
/// - 2000-2999: Lookup errors
/// - 3000-3999: Range errors
/// - 4000-4999: Command domain errors
/// - 5000-5999: Child script errors
/// - 6000-6999: Configuration errors
/// - 7000-7999: Script definition errors
/// - 8000-8999: I/O errors
/// - 9000-9999: Other errors
#[allow(dead_code)]
pub struct ErrorCode;

impl ErrorCode {
    // Format errors (1000-1999)
    pub const FORMAT_GENERIC: u16 = 1000;
    pub const FORMAT_MISSING_BRACES: u16 = 1001;
    pub const FORMAT_INVALID_NUMBER: u16 = 1002;
    pub const FORMAT_INVALID_JSON: u16 = 1003;
    pub const FORMAT_INVALID_EXPRESSION: u16 = 1004;

    // Lookup errors (2000-2999)
    pub const LOOKUP_GENERIC: u16 = 2000;
    pub const LOOKUP_VARIABLE: u16 = 2001;
    pub const LOOKUP_APP_INSTANCE: u16 = 2002;
    pub const LOOKUP_COLUMN: u16 = 2003;
    pub const LOOKUP_PROPERTY: u16 = 2004;
    pub const LOOKUP_KEY: u16 = 2005;
    pub const LOOKUP_COMMAND: u16 = 2006;

    // Range errors (3000-3999)
    pub const RANGE_GENERIC: u16 = 3000;
    pub const RANGE_INDEX: u16 = 3001;
    pub const RANGE_LOOP_LIMIT: u16 = 3002;

    // Domain errors (4000-4999)
    pub const DOMAIN_GENERIC: u16 = 4000;
    pub const DOMAIN_UNSUPPORTED_TYPE: u16 = 4001;
    pub const DOMAIN_THROWN: u16 = 4002;
    pub const DOMAIN_CONDITION: u16 = 4003;
    pub const DOMAIN_APP_INSTANCE_EXISTS: u16 = 4004;
    pub const DOMAIN_RETHROWN: u16 = 4005;

    // Child script errors (5000-5999)
    pub const CHILD_SCRIPT_FAILED: u16 = 5000;

    // Configuration errors (6000-6999)
    pub const CONFIG_GENERIC: u16 = 6000;
    pub const CONFIG_NOT_FOUND: u16 = 6001;
    pub const CONFIG_INVALID_TOML: u16 = 6002;
    pub const CONFIG_INVALID_VALUE: u16 = 6003;

    // Script errors (7000-7999)
    pub const SCRIPT_GENERIC: u16 = 7000;
    pub const SCRIPT_INVALID_JSON: u16 = 7001;
    pub const SCRIPT_INVALID_YAML: u16 = 7002;
    pub const SCRIPT_UNKNOWN_COMMAND: u16 = 7003;
    pub const SCRIPT_INVALID_PROPERTIES: u16 = 7004;
    pub const SCRIPT_LINE_ORDER: u16 = 7005;
    pub const SCRIPT_MISPLACED_MARKER: u16 = 7006;

    // I/O errors (8000-8999)
    pub const IO_GENERIC: u16 = 8000;
    pub const IO_NOT_FOUND: u16 = 8001;
    pub const IO_PERMISSION_DENIED: u16 = 8002;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        1000 => "Generic format error",
        1001 => "Variable target is not wrapped in braces",
        1002 => "Value is not a valid number",
        1003 => "Value is not valid JSON",
        1004 => "Expression could not be evaluated",

        2000 => "Generic lookup error",
        2001 => "Variable not found",
        2002 => "App instance not found",
        2003 => "Column not found",
        2004 => "Property not found",
        2005 => "Dictionary key not found",
        2006 => "Command not registered",

        3000 => "Generic range error",
        3001 => "Index out of range",
        3002 => "Loop iteration limit exceeded",

        4000 => "Generic command failure",
        4001 => "Unsupported variable type",
        4002 => "Error raised by script",
        4003 => "Condition could not be evaluated",
        4004 => "App instance already exists",
        4005 => "Rethrown error",

        5000 => "Child script failed",

        6000 => "Generic configuration error",
        6001 => "Configuration file not found",
        6002 => "Invalid TOML syntax in configuration",
        6003 => "Invalid value in configuration",

        7000 => "Generic script error",
        7001 => "Invalid JSON syntax in script",
        7002 => "Invalid YAML syntax in script",
        7003 => "Unknown command in script",
        7004 => "Invalid command properties",
        7005 => "Line numbers out of order",
        7006 => "Section marker outside its block",

        8000 => "Generic I/O error",
        8001 => "File or directory not found",
        8002 => "Permission denied",

        9000 => "Generic error",

        _ => "Unknown error code",
    }
}
