//! Per-tool argument contracts, resolved by tool name through one lookup table

use super::error::ToolCallError;
use crate::config::constants::tools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCommandArgs {
    pub command: String,
    pub purpose: String,
    #[serde(rename = "timeoutMs", default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFileArgs {
    pub filepath: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileArgs {
    pub filepath: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDirectoryArgs {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetMemoryKeysArgs {
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMemoryValueArgs {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetMemoryValueArgs {
    pub path: String,
    pub value: Value,
}

/// A fully validated tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    RunBashCommand(RunCommandArgs),
    WriteFile(WriteFileArgs),
    ReadFile(ReadFileArgs),
    ListDirectory(ListDirectoryArgs),
    WebSearch(WebSearchArgs),
    GetMemoryKeys(GetMemoryKeysArgs),
    GetMemoryValue(GetMemoryValueArgs),
    SetMemoryValue(SetMemoryValueArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    /// Any JSON value
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    /// Present in `arguments`. A null only counts for parameters that accept
    /// any JSON value.
    fn is_supplied(&self, arguments: &Map<String, Value>) -> bool {
        match arguments.get(self.name) {
            None => false,
            Some(Value::Null) => self.kind == ParamKind::Json,
            Some(_) => true,
        }
    }
}

const fn param(
    name: &'static str,
    kind: ParamKind,
    required: bool,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required,
        description,
    }
}

type Parser = fn(Value) -> Result<ToolInvocation, serde_json::Error>;

/// Everything the dispatcher and the model-facing declarations need about a tool
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub requires_confirmation: bool,
    parse: Parser,
}

impl PartialEq for ToolSpec {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl ToolSpec {
    pub fn required_params(&self) -> impl Iterator<Item = &'static str> {
        self.params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name)
    }
}

pub static TOOL_SPECS: &[ToolSpec] = &[
    ToolSpec {
        name: tools::RUN_BASH_COMMAND,
        description: "Run a shell command on the host after the user confirms it. Returns the exit code and the labelled STDOUT/STDERR output. Long-running commands are killed when the timeout expires.",
        params: &[
            param(
                "command",
                ParamKind::String,
                true,
                "Shell command to execute",
            ),
            param(
                "purpose",
                ParamKind::String,
                true,
                "Why this command is needed, shown to the user",
            ),
            param(
                "timeoutMs",
                ParamKind::Integer,
                false,
                "Timeout in milliseconds (default 120000)",
            ),
        ],
        requires_confirmation: true,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::RunBashCommand),
    },
    ToolSpec {
        name: tools::WRITE_FILE,
        description: "Create or overwrite a file with the given content after the user confirms it.",
        params: &[
            param("filepath", ParamKind::String, true, "Path of the file to write"),
            param("content", ParamKind::String, true, "Full file content"),
        ],
        requires_confirmation: true,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::WriteFile),
    },
    ToolSpec {
        name: tools::READ_FILE,
        description: "Read a text file. Large files are cut with a notice.",
        params: &[param(
            "filepath",
            ParamKind::String,
            true,
            "Path of the file to read",
        )],
        requires_confirmation: false,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::ReadFile),
    },
    ToolSpec {
        name: tools::LIST_DIRECTORY,
        description: "List the entries of a directory. Directories end with '/'.",
        params: &[param(
            "path",
            ParamKind::String,
            true,
            "Directory to list",
        )],
        requires_confirmation: false,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::ListDirectory),
    },
    ToolSpec {
        name: tools::WEB_SEARCH,
        description: "Search the web and return the top results with title, url and snippet.",
        params: &[param("query", ParamKind::String, true, "Search query")],
        requires_confirmation: false,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::WebSearch),
    },
    ToolSpec {
        name: tools::GET_MEMORY_KEYS,
        description: "List the keys stored at a path of your persistent memory. Paths use '/' or '.' separators; omit the path for the root.",
        params: &[param(
            "path",
            ParamKind::String,
            false,
            "Memory path such as 'system/info' (default: root)",
        )],
        requires_confirmation: false,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::GetMemoryKeys),
    },
    ToolSpec {
        name: tools::GET_MEMORY_VALUE,
        description: "Read the value stored at a path of your persistent memory.",
        params: &[param(
            "path",
            ParamKind::String,
            true,
            "Memory path such as 'system/info/os'",
        )],
        requires_confirmation: false,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::GetMemoryValue),
    },
    ToolSpec {
        name: tools::SET_MEMORY_VALUE,
        description: "Store a value at a path of your persistent memory, creating intermediate objects. Use it to remember facts about the system and the user.",
        params: &[
            param(
                "path",
                ParamKind::String,
                true,
                "Memory path such as 'system/info/os'",
            ),
            param("value", ParamKind::Json, true, "Any JSON value to store"),
        ],
        requires_confirmation: false,
        parse: |value| serde_json::from_value(value).map(ToolInvocation::SetMemoryValue),
    },
];

pub fn lookup(name: &str) -> Option<&'static ToolSpec> {
    TOOL_SPECS.iter().find(|spec| spec.name == name)
}

/// Validated invocation plus the canonical JSON text of its arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCall {
    pub spec: &'static ToolSpec,
    pub invocation: ToolInvocation,
    pub canonical_arguments: String,
}

/// Resolve `name`, parse `raw_arguments` and check the argument contract
pub fn parse_call(name: &str, raw_arguments: &str) -> Result<ParsedCall, ToolCallError> {
    let spec = lookup(name).ok_or_else(|| ToolCallError::UnknownTool(name.to_string()))?;

    let value = if raw_arguments.trim().is_empty() {
        Value::Object(Map::new())
    } else {
        serde_json::from_str::<Value>(raw_arguments).map_err(|err| {
            ToolCallError::ArgumentParse {
                tool: name.to_string(),
                raw: raw_arguments.to_string(),
                message: err.to_string(),
            }
        })?
    };
    let Value::Object(arguments) = &value else {
        return Err(ToolCallError::ArgumentParse {
            tool: name.to_string(),
            raw: raw_arguments.to_string(),
            message: "arguments must be a JSON object".to_string(),
        });
    };

    if let Some(missing) = spec
        .params
        .iter()
        .find(|param| param.required && !param.is_supplied(arguments))
    {
        return Err(ToolCallError::MissingParameter {
            tool: name.to_string(),
            parameter: missing.name.to_string(),
        });
    }

    let canonical_arguments = value.to_string();
    let invocation = (spec.parse)(value).map_err(|err| ToolCallError::InvalidParameter {
        tool: name.to_string(),
        message: err.to_string(),
    })?;

    Ok(ParsedCall {
        spec,
        invocation,
        canonical_arguments,
    })
}
