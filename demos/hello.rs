//! # Example: hello
//!
//! One module, two tasks:
//! - `example.say_hi` prints a greeting every second;
//! - `example.tactful_hello` waits for the `tick` event, then says hi once.
//!
//! A third task pushes `{ "tick": true }` into the `ticks` datastream after
//! three seconds and then asks the runtime to shut down.
//!
//! ## Flow
//! ```text
//! Runtime::run()
//!     ├─► Example::init(ctx)
//!     │     ├─► ctx.datastream("ticks").set_event(is_true("tick"))
//!     │     └─► ctx.add_task(say_hi), ctx.add_task(tactful_hello)
//!     ├─► Scheduler::run()
//!     │     ├─► say_hi:        loop { print; sleep(1s) }
//!     │     ├─► tactful_hello: tick.wait() ... "... hi?"
//!     │     └─► ticker:        sleep(3s); push tick; shutdown()
//!     └─► every referee neutralizes
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example hello
//! ```

use std::sync::Arc;
use std::time::Duration;

use loopvisor::{
    Config, Module, ModuleContext, ModuleError, Predicate, Runtime, SimProvider, TaskError,
    TaskSpec,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct Example {
    message: &'static str,
}

impl Module for Example {
    fn name(&self) -> &str {
        "example"
    }

    fn init(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), ModuleError> {
        let message = self.message;
        ctx.add_task(TaskSpec::from_fn(
            "example.say_hi",
            move |ctx: CancellationToken| async move {
                while !ctx.is_cancelled() {
                    println!("{message}");
                    tokio::select! {
                        _ = ctx.cancelled() => break,
                        _ = loopvisor::sleep(Duration::from_secs(1)) => {}
                    }
                }
                Ok::<(), TaskError>(())
            },
        ));

        let tick = ctx
            .datastream("ticks")
            .set_event(Predicate::is_true("tick"));
        ctx.add_task(TaskSpec::from_fn(
            "example.tactful_hello",
            move |ctx: CancellationToken| {
                let tick = tick.clone();
                async move {
                    let ticked = tokio::select! {
                        _ = ctx.cancelled() => false,
                        r = tick.wait() => r.is_ok(),
                    };
                    tick.drop_event();
                    if ticked {
                        println!("... hi?");
                    }
                    Ok::<(), TaskError>(())
                }
            },
        ));
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let runtime = Arc::new(
        Runtime::builder(Config::default(), SimProvider::new())
            .with_module(Example {
                message: "Hello world!",
            })
            .build(),
    );

    let ticks = runtime.datastreams().get("ticks");
    let handle = Arc::clone(&runtime);
    runtime.scheduler().schedule(TaskSpec::from_fn(
        "ticker",
        move |_ctx: CancellationToken| {
            let ticks = ticks.clone();
            let runtime = Arc::clone(&handle);
            async move {
                loopvisor::sleep(Duration::from_secs(3)).await;
                ticks.push_value(serde_json::json!({ "tick": true }))?;
                loopvisor::sleep(Duration::from_millis(100)).await;
                runtime.shutdown();
                Ok::<(), TaskError>(())
            }
        },
    ));

    runtime.run().await?;
    println!("bye");
    Ok(())
}
