/*!
 * Simulated Engine
 *
 * Interpreter stand-in that drives the policy layer without a real language
 * runtime. Script functions are Rust closures registered by name, chunk files
 * are read from disk and handed to a pluggable evaluator, and instruction
 * execution is simulated with [`SimulatedEngine::step`].
 */

use super::traits::{ScriptEngine, ScriptHost};
use super::types::{BuiltinLibrary, EngineError, EngineResult, HookEvent};
use super::value::{Function, Key, TableRef, Value};
use crate::core::types::Size;
use crate::memory::{AllocationGuard, Block};
use ahash::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Bytes the engine allocates for its own state when created
pub const BASE_STATE_SIZE: Size = 2048;

/// Script function body
pub type ScriptFn =
    Arc<dyn Fn(&mut SimulatedEngine, &mut dyn ScriptHost, &[Value]) -> EngineResult<Value> + Send + Sync>;

/// Evaluates the source text of a chunk file
pub type ChunkEvaluator = Arc<
    dyn Fn(&mut SimulatedEngine, &mut dyn ScriptHost, &Path, &str) -> EngineResult<Value> + Send + Sync,
>;

const BASE_MEMBERS: &[&str] = &[
    "assert",
    "collectgarbage",
    "dofile",
    "error",
    "getfenv",
    "getmetatable",
    "ipairs",
    "load",
    "loadfile",
    "loadstring",
    "newproxy",
    "next",
    "pairs",
    "pcall",
    "print",
    "rawequal",
    "rawget",
    "rawset",
    "select",
    "setfenv",
    "setmetatable",
    "tonumber",
    "tostring",
    "type",
    "unpack",
    "xpcall",
];

const COROUTINE_MEMBERS: &[&str] = &["create", "resume", "running", "status", "wrap", "yield"];

fn library_members(library: BuiltinLibrary) -> &'static [&'static str] {
    match library {
        BuiltinLibrary::Base => BASE_MEMBERS,
        BuiltinLibrary::String => &[
            "byte", "char", "dump", "find", "format", "gmatch", "gsub", "len", "lower", "match",
            "rep", "reverse", "sub", "upper",
        ],
        BuiltinLibrary::Math => &[
            "abs", "acos", "asin", "atan", "atan2", "ceil", "cos", "cosh", "deg", "exp", "floor",
            "fmod", "frexp", "ldexp", "log", "log10", "max", "min", "modf", "pow", "rad", "random",
            "randomseed", "sin", "sinh", "sqrt", "tan", "tanh",
        ],
        BuiltinLibrary::Table => &["concat", "foreach", "foreachi", "getn", "insert", "maxn", "remove", "sort"],
        BuiltinLibrary::Os => &[
            "clock", "date", "difftime", "execute", "exit", "getenv", "remove", "rename",
            "setlocale", "time", "tmpname",
        ],
        BuiltinLibrary::CircularBuffer => &["new"],
        BuiltinLibrary::BloomFilter => &["new"],
        BuiltinLibrary::HyperLogLog => &["new"],
        BuiltinLibrary::Lpeg => &[
            "B", "C", "Carg", "Cb", "Cc", "Cf", "Cg", "Cmt", "Cp", "Cs", "Ct", "P", "R", "S", "V",
            "locale", "match", "setmaxstack", "type", "version",
        ],
        BuiltinLibrary::Protobuf => &["decode", "encode", "pack", "unpack", "load", "type"],
        BuiltinLibrary::Json => &[
            "decode",
            "decode_invalid_numbers",
            "decode_max_depth",
            "encode",
            "encode_invalid_numbers",
            "encode_keep_buffer",
            "encode_max_depth",
            "encode_number_precision",
            "encode_sparse_array",
            "new",
        ],
    }
}

fn library_prefix(library: BuiltinLibrary) -> &'static str {
    match library {
        BuiltinLibrary::Base => "",
        BuiltinLibrary::String => "string",
        BuiltinLibrary::Math => "math",
        BuiltinLibrary::Table => "table",
        BuiltinLibrary::Os => "os",
        BuiltinLibrary::CircularBuffer => "circular_buffer",
        BuiltinLibrary::BloomFilter => "bloom_filter",
        BuiltinLibrary::HyperLogLog => "hyperloglog",
        BuiltinLibrary::Lpeg => "lpeg",
        BuiltinLibrary::Protobuf => "pb",
        BuiltinLibrary::Json => "cjson",
    }
}

/// Simulated interpreter
pub struct SimulatedEngine {
    globals: TableRef,
    functions: HashMap<String, ScriptFn, RandomState>,
    evaluator: ChunkEvaluator,
    allocator: AllocationGuard,
    heap: Vec<Block>,
    hook_interval: u32,
    hook_remaining: u32,
    loaded_files: Vec<PathBuf>,
    closed: bool,
}

impl SimulatedEngine {
    /// Create an engine whose allocations go through `allocator`
    ///
    /// Fails when the base state does not fit the memory ceiling.
    pub fn new(allocator: AllocationGuard) -> EngineResult<Self> {
        let state = allocator.allocate(BASE_STATE_SIZE)?;
        info!("Simulated engine created");
        Ok(Self {
            globals: TableRef::new(),
            functions: HashMap::default(),
            evaluator: Arc::new(evaluate_manifest),
            allocator,
            heap: vec![state],
            hook_interval: 0,
            hook_remaining: 0,
            loaded_files: Vec::new(),
            closed: false,
        })
    }

    /// Define a global script function
    pub fn define_function<F>(&mut self, name: &str, body: F)
    where
        F: Fn(&mut SimulatedEngine, &mut dyn ScriptHost, &[Value]) -> EngineResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.functions.insert(name.to_string(), Arc::new(body));
        self.globals.set_field(name, Value::Function(Function::new(name)));
    }

    /// Replace the chunk evaluator used by `load_file`
    pub fn set_chunk_evaluator<F>(&mut self, evaluator: F)
    where
        F: Fn(&mut SimulatedEngine, &mut dyn ScriptHost, &Path, &str) -> EngineResult<Value>
            + Send
            + Sync
            + 'static,
    {
        self.evaluator = Arc::new(evaluator);
    }

    /// Execute `instructions` simulated instructions, firing the count hook
    /// each time the armed interval elapses
    pub fn step(&mut self, instructions: u32, host: &mut dyn ScriptHost) -> EngineResult<()> {
        if self.hook_interval == 0 {
            return Ok(());
        }
        let mut left = instructions;
        while left > 0 {
            if left < self.hook_remaining {
                self.hook_remaining -= left;
                return Ok(());
            }
            left -= self.hook_remaining;
            self.hook_remaining = 0;
            host.instruction_hook(HookEvent::Count)?;
            self.hook_remaining = self.hook_interval;
        }
        Ok(())
    }

    /// Allocate script-owned memory; returns the block handle
    pub fn allocate(&mut self, size: Size) -> EngineResult<usize> {
        let block = self.allocator.allocate(size)?;
        self.heap.push(block);
        Ok(self.heap.len() - 1)
    }

    /// Grow or shrink a script-owned block
    pub fn resize(&mut self, handle: usize, size: Size) -> EngineResult<()> {
        let block = self
            .heap
            .get_mut(handle)
            .ok_or_else(|| EngineError::Runtime(format!("invalid block handle {}", handle)))?;
        block.resize(size)?;
        Ok(())
    }

    /// Drop every script-owned block, keeping the base state
    pub fn collect_garbage(&mut self) {
        self.heap.truncate(1);
    }

    /// Bytes currently held by the engine
    pub fn heap_size(&self) -> Size {
        self.heap.iter().map(Block::size).sum()
    }

    /// Chunk files loaded so far, in load order
    pub fn loaded_files(&self) -> &[PathBuf] {
        &self.loaded_files
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

impl fmt::Debug for SimulatedEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedEngine")
            .field("functions", &self.functions.len())
            .field("heap_size", &self.heap_size())
            .field("hook_interval", &self.hook_interval)
            .field("hook_remaining", &self.hook_remaining)
            .field("closed", &self.closed)
            .finish()
    }
}

impl ScriptEngine for SimulatedEngine {
    fn set_instruction_hook(&mut self, interval: u32) {
        self.hook_interval = interval;
        self.hook_remaining = interval;
    }

    fn clear_instruction_hook(&mut self) {
        self.hook_interval = 0;
        self.hook_remaining = 0;
    }

    fn hook_count(&self) -> u32 {
        self.hook_interval
    }

    fn hook_count_remaining(&self) -> u32 {
        self.hook_remaining
    }

    fn globals(&self) -> TableRef {
        self.globals.clone()
    }

    fn open_library(&mut self, library: BuiltinLibrary) -> EngineResult<TableRef> {
        self.ensure_open()?;
        let prefix = library_prefix(library);

        if library == BuiltinLibrary::Base {
            for member in BASE_MEMBERS {
                self.globals.set_field(member, Value::Function(Function::new(member)));
            }
            let coroutine: TableRef = COROUTINE_MEMBERS
                .iter()
                .map(|m| (Key::from(*m), Value::Function(Function::new(&format!("coroutine.{}", m)))))
                .collect();
            self.globals.set_field("coroutine", Value::Table(coroutine));
            self.globals.set_field("_VERSION", Value::from("Lua 5.1"));
            return Ok(self.globals.clone());
        }

        let table: TableRef = library_members(library)
            .iter()
            .map(|m| (Key::from(*m), Value::Function(Function::new(&format!("{}.{}", prefix, m)))))
            .collect();
        if library == BuiltinLibrary::Lpeg {
            table.set_field("version", Value::from("0.12"));
        }
        debug!(library = prefix, members = table.len(), "Opened library");
        Ok(table)
    }

    fn load_file(&mut self, path: &Path, host: &mut dyn ScriptHost) -> EngineResult<Value> {
        self.ensure_open()?;
        let source =
            std::fs::read_to_string(path).map_err(|_| EngineError::Io(path.display().to_string()))?;
        self.loaded_files.push(path.to_path_buf());
        let evaluator = Arc::clone(&self.evaluator);
        evaluator(self, host, path, &source)
    }

    fn call_function(
        &mut self,
        name: &str,
        args: &[Value],
        host: &mut dyn ScriptHost,
    ) -> EngineResult<Value> {
        self.ensure_open()?;
        let body = self
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UndefinedFunction(name.to_string()))?;
        body(self, host, args)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.heap.clear();
        self.functions.clear();
        self.globals.clear();
        self.clear_instruction_hook();
        self.closed = true;
        info!("Simulated engine closed");
    }
}

/// Default chunk evaluator
///
/// Each non-blank, non-comment line is one statement and costs one instruction:
///
/// ```text
/// -- comment
/// name = 42
/// greeting = "hello"
/// dep = require "other"
/// output "text"
/// ```
///
/// The chunk evaluates to a table of its assignments.
pub fn evaluate_manifest(
    engine: &mut SimulatedEngine,
    host: &mut dyn ScriptHost,
    path: &Path,
    source: &str,
) -> EngineResult<Value> {
    let module = TableRef::new();

    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("--") {
            continue;
        }
        engine.step(1, host)?;

        let syntax_error = |near: &str| {
            EngineError::Syntax(format!(
                "{}:{}: unexpected symbol near '{}'",
                path.display(),
                index + 1,
                near
            ))
        };

        if let Some(rest) = keyword_argument(line, "output") {
            let value = parse_literal(rest).ok_or_else(|| syntax_error(rest))?;
            host.emit(&[value])?;
            continue;
        }
        if let Some(name) = parse_require(line) {
            host.require(engine, name)?;
            continue;
        }

        let (lhs, rhs) = line.split_once('=').ok_or_else(|| syntax_error(line))?;
        let (key, expr) = (lhs.trim(), rhs.trim());
        if !is_identifier(key) {
            return Err(syntax_error(key));
        }
        let value = match parse_require(expr) {
            Some(name) => host.require(engine, name)?,
            None => parse_literal(expr).ok_or_else(|| syntax_error(expr))?,
        };
        module.set_field(key, value);
    }

    Ok(Value::Table(module))
}

/// Text following `keyword` when the line is a call of it
fn keyword_argument<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '(' => {
            let rest = rest.trim();
            Some(
                rest.strip_prefix('(')
                    .and_then(|r| r.strip_suffix(')'))
                    .map(str::trim)
                    .unwrap_or(rest),
            )
        }
        _ => None,
    }
}

fn parse_require(text: &str) -> Option<&str> {
    parse_string(keyword_argument(text, "require")?)
}

fn parse_string(text: &str) -> Option<&str> {
    ['"', '\''].iter().find_map(|q| {
        text.strip_prefix(*q)
            .and_then(|t| t.strip_suffix(*q))
            .filter(|inner| !inner.contains(*q))
    })
}

fn parse_literal(text: &str) -> Option<Value> {
    match text {
        "nil" => Some(Value::Nil),
        "true" => Some(Value::Boolean(true)),
        "false" => Some(Value::Boolean(false)),
        _ => parse_string(text)
            .map(Value::from)
            .or_else(|| text.parse::<f64>().ok().map(Value::Number)),
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
