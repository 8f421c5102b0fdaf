//! Built-in command implementations

use super::CommandRegistry;

pub mod data_table;
pub mod dictionary;
pub mod flow;
pub mod list;
pub mod message;
pub mod stopwatch;
pub mod text;
pub mod variable;

pub use data_table::{
    AddDataRowCommand, CreateDataTableCommand, GetDataRowCommand, GetDataRowCountCommand,
};
pub use dictionary::{AddDictionaryItemCommand, GetDictionaryValueCommand};
pub use flow::{GetExceptionMessageCommand, PauseCommand, ThrowExceptionCommand};
pub use list::{AddListItemCommand, GetListCountCommand, UpdateListItemCommand};
pub use message::{LogDataCommand, ShowMessageCommand};
pub use stopwatch::{Stopwatch, StopwatchCommand};
pub use text::{RegexMatchesCommand, RegexReplaceCommand, RegexSplitCommand};
pub use variable::{SetVariableCommand, SetVariableIndexCommand};

pub(crate) fn register_defaults(registry: &mut CommandRegistry) {
    registry.register_properties::<SetVariableCommand>(
        "set_variable",
        "Resolve text and store it into a variable",
    );
    registry.register_properties::<SetVariableIndexCommand>(
        "set_variable_index",
        "Move a list or table variable's cursor",
    );
    registry.register_properties::<ShowMessageCommand>(
        "show_message",
        "Report a message to the host",
    );
    registry.register_properties::<LogDataCommand>("log_data", "Write a line to the engine log");
    registry.register_properties::<PauseCommand>("pause", "Wait for a number of milliseconds");
    registry.register_properties::<ThrowExceptionCommand>(
        "throw_exception",
        "Fail the current line with a custom message",
    );
    registry.register_properties::<GetExceptionMessageCommand>(
        "get_exception_message",
        "Store the message of the most recent error",
    );
    registry.register_properties::<StopwatchCommand>(
        "stopwatch",
        "Start, stop, reset or measure a named stopwatch",
    );
    registry.register_properties::<RegexSplitCommand>(
        "regex_split",
        "Split text on a regular expression into a list",
    );
    registry.register_properties::<RegexReplaceCommand>(
        "regex_replace",
        "Replace regular expression matches in text",
    );
    registry.register_properties::<RegexMatchesCommand>(
        "regex_matches",
        "Collect all regular expression matches into a list",
    );
    registry.register_properties::<CreateDataTableCommand>(
        "create_data_table",
        "Create an empty table with named columns",
    );
    registry.register_properties::<AddDataRowCommand>(
        "add_data_row",
        "Append a row of values to a table",
    );
    registry.register_properties::<GetDataRowCommand>(
        "get_data_row",
        "Copy one table row into a row variable",
    );
    registry.register_properties::<GetDataRowCountCommand>(
        "get_data_row_count",
        "Store the number of rows in a table",
    );
    registry.register_properties::<AddListItemCommand>(
        "add_list_item",
        "Append an item to a list, creating the list if needed",
    );
    registry.register_properties::<UpdateListItemCommand>(
        "update_list_item",
        "Replace the list item at an index",
    );
    registry.register_properties::<GetListCountCommand>(
        "get_list_count",
        "Store the number of items in a list",
    );
    registry.register_properties::<AddDictionaryItemCommand>(
        "add_dictionary_item",
        "Insert a key and value into a dictionary, creating it if needed",
    );
    registry.register_properties::<GetDictionaryValueCommand>(
        "get_dictionary_value",
        "Store the value for a dictionary key",
    );
}
