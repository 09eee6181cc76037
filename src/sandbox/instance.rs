/*!
 * Sandbox Instance
 *
 * Owns one engine together with the policy state wrapped around it: the quota
 * ledger, output buffer, instruction guard and capability loader. Scripts reach
 * the policy layer through [`SandboxCore`], the instance's [`ScriptHost`].
 */

use super::config::SandboxConfig;
use super::types::SandboxStats;
use crate::core::errors::{ErrorMessage, FatalError, SandboxError, SandboxResult};
use crate::core::types::{SandboxId, SandboxState, Size, UsageStat, UsageType};
use crate::engine::{EngineError, EngineResult, HookEvent, ScriptEngine, ScriptHost, Value};
use crate::execution::InstructionGuard;
use crate::memory::{AllocationGuard, QuotaLedger};
use crate::monitoring::CallSpan;
use crate::output::{self, EncoderRegistry, NativeEncoder, OutputBuffer};
use crate::security::CapabilityLoader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

static NEXT_SANDBOX_ID: AtomicU64 = AtomicU64::new(1);

/// Policy state the engine calls back into while a script runs
#[derive(Debug)]
pub struct SandboxCore {
    id: SandboxId,
    ledger: Arc<QuotaLedger>,
    output: OutputBuffer,
    encoders: EncoderRegistry,
    loader: Arc<CapabilityLoader>,
    instructions: InstructionGuard,
}

impl SandboxCore {
    fn refresh_output_usage(&self) {
        self.ledger.output.record(self.output.pos());
    }

    /// Turn a policy violation into the engine's abort signal
    ///
    /// The single point where sandbox errors enter the fatal-error channel.
    fn abort(&self, err: SandboxError) -> FatalError {
        debug!(sandbox_id = self.id, error = %err, "Aborting script call");
        FatalError::new(err)
    }
}

impl ScriptHost for SandboxCore {
    fn emit(&mut self, args: &[Value]) -> Result<(), FatalError> {
        let result = output::emit(&mut self.output, &self.encoders, args);
        self.refresh_output_usage();
        result.map_err(|err| self.abort(err.into()))
    }

    fn require(&mut self, engine: &mut dyn ScriptEngine, name: &str) -> Result<Value, FatalError> {
        let loader = Arc::clone(&self.loader);
        loader
            .require(engine, self, name)
            .map_err(|err| self.abort(err))
    }

    fn instruction_hook(&mut self, event: HookEvent) -> Result<(), FatalError> {
        self.instructions
            .on_hook(event)
            .map_err(|err| self.abort(err.into()))
    }
}

/// One isolated script instance
#[derive(Debug)]
pub struct Sandbox<E: ScriptEngine> {
    engine: Option<E>,
    core: SandboxCore,
    state: SandboxState,
    config: SandboxConfig,
    last_error: ErrorMessage,
}

impl<E: ScriptEngine> Sandbox<E> {
    /// Build an instance around the engine produced by `factory`
    ///
    /// The factory receives the instance's allocation guard; every engine
    /// allocation must go through it.
    pub fn create<F>(config: SandboxConfig, factory: F) -> SandboxResult<Self>
    where
        F: FnOnce(AllocationGuard) -> EngineResult<E>,
    {
        config.validate()?;

        let id = NEXT_SANDBOX_ID.fetch_add(1, Ordering::Relaxed);
        let ledger = Arc::new(QuotaLedger::new(
            config.memory_limit,
            config.instruction_limit as Size,
            config.output_limit,
        ));
        let engine = factory(AllocationGuard::new(Arc::clone(&ledger)))
            .map_err(|e| e.into_sandbox_error())?;
        let output = OutputBuffer::new(config.output_initial_size, config.output_limit)?;

        info!(
            sandbox_id = id,
            memory_limit = config.memory_limit,
            instruction_limit = config.instruction_limit,
            output_limit = config.output_limit,
            "Sandbox created"
        );

        Ok(Self {
            engine: Some(engine),
            core: SandboxCore {
                id,
                ledger,
                output,
                encoders: EncoderRegistry::new(),
                loader: Arc::new(CapabilityLoader::new(config.require_path.clone())),
                instructions: InstructionGuard::new(config.instruction_limit),
            },
            state: SandboxState::Unknown,
            config,
            last_error: ErrorMessage::default(),
        })
    }

    /// Install the base library and module cache; moves to `Running`
    pub fn init(&mut self) -> SandboxResult<()> {
        self.expect_state(SandboxState::Unknown)?;
        let engine = self.engine.as_mut().ok_or(SandboxError::Terminated)?;
        self.core.loader.install(engine)?;
        self.state = SandboxState::Running;
        info!(sandbox_id = self.core.id, "Sandbox running");
        Ok(())
    }

    fn expect_state(&self, expected: SandboxState) -> SandboxResult<()> {
        match self.state {
            SandboxState::Terminated => Err(SandboxError::Terminated),
            actual if actual == expected => Ok(()),
            actual => Err(SandboxError::InvalidState { expected, actual }),
        }
    }

    /// Call a global script function under the instance's budgets
    ///
    /// A failed call leaves the instance running; its partial output is
    /// discarded and the error text is kept in [`Sandbox::last_error`].
    pub fn call(&mut self, function: &str, args: &[Value]) -> SandboxResult<Value> {
        self.run_guarded(function, |engine, core| {
            engine
                .call_function(function, args, core)
                .map_err(EngineError::into_sandbox_error)
        })
    }

    /// Resolve a module on the script's behalf, e.g. to preload it
    ///
    /// Module chunks run under a fresh instruction budget, and a failed load is
    /// handled like a failed call.
    pub fn require(&mut self, name: &str) -> SandboxResult<Value> {
        self.run_guarded(&format!("require({})", name), |engine, core| {
            let loader = Arc::clone(&core.loader);
            loader.require(engine, core, name)
        })
    }

    /// Run `op` with the instruction hook armed, then settle usage, output and
    /// the last-error slot
    fn run_guarded<T, F>(&mut self, label: &str, op: F) -> SandboxResult<T>
    where
        F: FnOnce(&mut E, &mut SandboxCore) -> SandboxResult<T>,
    {
        self.expect_state(SandboxState::Running)?;
        let engine = self.engine.as_mut().ok_or(SandboxError::Terminated)?;
        let core = &mut self.core;

        let span = CallSpan::new(core.id, label);
        let _enter = span.enter();

        let mark = core.output.pos();
        core.instructions.arm(&mut *engine);
        let result = op(&mut *engine, &mut *core);

        let used = core.instructions.usage(&*engine) as Size;
        core.ledger.instruction.record(used);

        if result.is_err() {
            core.output.truncate(mark);
        }
        core.refresh_output_usage();
        span.record_usage(used, core.output.pos());

        if let Err(err) = &result {
            let message = err.to_string();
            span.record_error(&message);
            warn!(error = %message, quota = err.is_quota_exceeded(), "Call failed");
            self.last_error = ErrorMessage::new(&message);
        }
        result
    }

    /// Register the output encoder for a userdata type
    pub fn register_encoder(&mut self, type_name: &str, encoder: NativeEncoder) -> SandboxResult<()> {
        if self.state == SandboxState::Terminated {
            return Err(SandboxError::Terminated);
        }
        self.core.encoders.register(type_name, encoder);
        Ok(())
    }

    /// Bytes emitted since the last take; rewinds the buffer
    pub fn take_output(&mut self) -> SandboxResult<Vec<u8>> {
        if self.state == SandboxState::Terminated {
            return Err(SandboxError::Terminated);
        }
        let bytes = self.core.output.take();
        self.core.refresh_output_usage();
        Ok(bytes)
    }

    /// Bytes emitted since the last take
    pub fn output(&self) -> SandboxResult<&[u8]> {
        if self.state == SandboxState::Terminated {
            return Err(SandboxError::Terminated);
        }
        Ok(self.core.output.as_bytes())
    }

    pub fn usage(&self, kind: UsageType, stat: UsageStat) -> Size {
        self.core.ledger.usage(kind, stat)
    }

    /// Instructions consumed by the most recent call
    pub fn instruction_usage(&self) -> Size {
        self.core.ledger.instruction.current()
    }

    /// Text of the most recent call failure, empty if none
    pub fn last_error(&self) -> &str {
        self.last_error.as_str()
    }

    #[inline]
    pub fn id(&self) -> SandboxId {
        self.core.id
    }

    #[inline]
    pub fn state(&self) -> SandboxState {
        self.state
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// The engine, for host-side setup; `None` once terminated
    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.engine.as_mut()
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn stats(&self) -> SandboxStats {
        SandboxStats {
            id: self.core.id,
            state: self.state,
            usage: self.core.ledger.snapshot(),
            last_error: self.last_error.clone(),
        }
    }

    /// Release the engine; later operations fail with `sandbox terminated`
    ///
    /// Calling this again has no effect.
    pub fn terminate(&mut self) {
        if self.state == SandboxState::Terminated {
            return;
        }
        if let Some(mut engine) = self.engine.take() {
            engine.close();
        }
        self.core.ledger.memory.clear();
        self.state = SandboxState::Terminated;
        info!(sandbox_id = self.core.id, "Sandbox terminated");
    }
}

impl<E: ScriptEngine> Drop for Sandbox<E> {
    fn drop(&mut self) {
        self.terminate();
    }
}
