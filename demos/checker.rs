use clap::Parser;
use simplelog::LevelFilter;

use range_rs::apint::ApInt;
use range_rs::builder::FunctionBuilder;
use range_rs::cmp::CmpChecker;
use range_rs::config::RangeConfig;
use range_rs::ir::{Callee, Constant, DebugLoc, GlobalVar, Program, Value};
use range_rs::pass::RangePass;
use range_rs::predicate::Predicate;
use range_rs::types::Ty;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Rounds before slowly converging ids are widened.
    #[arg(long, value_name = "INT", default_value = "5")]
    max_iterations: usize,

    /// Trace every update of this id.
    #[arg(long, value_name = "ID")]
    watch: Option<String>,

    /// Log level.
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: LevelFilter,
}

/// ```c
/// unsigned short limit = 64;
///
/// static inline int in_bounds(unsigned short n) {
///     return n < 1000;            // util.h:12
/// }
///
/// void handle(unsigned short n) {
///     if (limit > 4096) return;   // handle.c:7
///     if (in_bounds(n)) ...       // handle.c:9
///     if (n == limit) ...         // handle.c:11
/// }
///
/// void main() { handle(3); handle(70); }
/// ```
fn build() -> Program {
    let short = Ty::int(16);
    let mut program = Program::new();
    program.add_global(GlobalVar::new(
        "limit",
        short.clone(),
        Some(Constant::Int(ApInt::from_u64(16, 64))),
    ));

    let mut b = FunctionBuilder::new("handle", &[short.clone()], Ty::Void);
    let (entry, early, body) = (b.block(), b.block(), b.block());
    b.switch_to(entry);
    let n = b.param(0);
    b.name(&n, "n");
    b.set_loc(Some(DebugLoc::new("handle.c", 7, 15, "handle")));
    let limit = b.load_global("limit", short.clone());
    b.name(&limit, "limit");
    let c = b.icmp(Predicate::Ugt, limit.clone(), Value::int(16, 4096));
    b.cond_br(c, early, body);
    b.switch_to(early);
    b.ret(None);
    b.switch_to(body);
    b.set_loc(Some(
        DebugLoc::new("util.h", 12, 14, "in_bounds").inlined_at(DebugLoc::new("handle.c", 9, 9, "handle")),
    ));
    b.icmp(Predicate::Ult, n.clone(), Value::int(16, 1000));
    b.set_loc(Some(DebugLoc::new("handle.c", 11, 11, "handle")));
    b.icmp(Predicate::Eq, n, limit);
    b.ret(None);
    let handle = program.add_function(b.finish());

    let mut b = FunctionBuilder::new("main", &[], Ty::Void);
    let entry = b.block();
    b.switch_to(entry);
    b.call_void(Callee::Direct(handle), vec![Value::int(16, 3)]);
    b.call_void(Callee::Direct(handle), vec![Value::int(16, 70)]);
    b.ret(None);
    program.add_function(b.finish());

    program
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        args.log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let program = build();

    let mut config = RangeConfig::default().with_max_iterations(args.max_iterations);
    if let Some(watch) = args.watch {
        config = config.with_watch(watch);
    }

    let mut pass = RangePass::new(&program).with_config(config);
    let stats = pass.run()?;
    println!("Converged in {} rounds", stats.rounds);

    let bounds = pass.bounds()?;
    let diagnostics = CmpChecker::new(&program, &bounds).check();
    for diagnostic in &diagnostics {
        print!("{}", diagnostic);
    }
    println!("Found {} fixed comparisons", diagnostics.len());

    Ok(())
}
