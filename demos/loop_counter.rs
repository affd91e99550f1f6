use clap::Parser;
use simplelog::LevelFilter;

use range_rs::apint::ApInt;
use range_rs::builder::FunctionBuilder;
use range_rs::config::RangeConfig;
use range_rs::ir::{BinOp, Callee, Constant, GlobalVar, Program, Value};
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
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LevelFilter,

    /// Print the control-flow graph of this function in DOT format.
    #[arg(long, value_name = "FUNC")]
    dot: Option<String>,
}

/// ```c
/// int ticks = 0;
/// int level;
///
/// void tick() { ticks = ticks + 1; }
/// int scale(int x) { if (x > 100) return 100; return x; }
///
/// void main() {
///     for (int i = 0; i < 8; i++) tick();
///     level = scale(ticks);
/// }
/// ```
fn build() -> Program {
    let int = Ty::int(32);
    let mut program = Program::new();
    program.add_global(GlobalVar::new("ticks", int.clone(), Some(Constant::Int(ApInt::zero(32)))));
    program.add_global(GlobalVar::new("level", int.clone(), None));

    let mut b = FunctionBuilder::new("tick", &[], Ty::Void);
    let entry = b.block();
    b.switch_to(entry);
    let t = b.load_global("ticks", int.clone());
    let t = b.binary(BinOp::Add, t, Value::int(32, 1));
    b.store_global(t, "ticks");
    b.ret(None);
    let tick = program.add_function(b.finish());

    let mut b = FunctionBuilder::new("scale", &[int.clone()], int.clone());
    let (entry, clip, keep) = (b.block(), b.block(), b.block());
    b.switch_to(entry);
    let x = b.param(0);
    b.name(&x, "x");
    let c = b.icmp(Predicate::Ugt, x.clone(), Value::int(32, 100));
    b.cond_br(c, clip, keep);
    b.switch_to(clip);
    b.ret(Some(Value::int(32, 100)));
    b.switch_to(keep);
    b.ret(Some(x));
    let scale = program.add_function(b.finish());

    let mut b = FunctionBuilder::new("main", &[], Ty::Void);
    let (entry, header, body, exit) = (b.block(), b.block(), b.block(), b.block());
    b.switch_to(entry);
    b.br(header);
    b.switch_to(header);
    let i = b.phi(int.clone());
    b.name(&i, "i");
    let c = b.icmp(Predicate::Slt, i.clone(), Value::int(32, 8));
    b.cond_br(c, body, exit);
    b.switch_to(body);
    b.call_void(Callee::Direct(tick), vec![]);
    let next = b.binary(BinOp::Add, i.clone(), Value::int(32, 1));
    b.br(header);
    b.switch_to(exit);
    let t = b.load_global("ticks", int.clone());
    let level = b.call(Callee::Direct(scale), vec![t], int);
    b.store_global(level, "level");
    b.ret(None);
    b.add_incoming(&i, entry, Value::int(32, 0));
    b.add_incoming(&i, body, next);
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

    println!("args = {:?}", args);

    let time_total = std::time::Instant::now();

    let program = build();
    if let Some(name) = &args.dot {
        match program.function_by_name(name).and_then(|id| program.function(id)) {
            Some(func) => println!("{}", func.to_dot()?),
            None => println!("No function named {}", name),
        }
    }

    let mut config = RangeConfig::default().with_max_iterations(args.max_iterations);
    if let Some(watch) = args.watch {
        config = config.with_watch(watch);
    }

    let mut pass = RangePass::new(&program).with_config(config);
    let stats = pass.run()?;
    println!("stats = {:?}", stats);
    print!("{}", pass.table());

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
