//! Intersection size of two symbolic sets.
//!
//! Builds the sets of objects #1 and #2 from the given element lists,
//! optionally merges an unconstrained input set into the first one, and
//! prints reads, regions, the intersection size, the update-log graph and
//! the table decoded from a small model.
//!
//! Run with:
//! ```bash
//! cargo run --example intersection -- --first 1,2,3 --second 2,3,4 --symbolic
//! ```

use clap::Parser;

use symset_rs::collection::Heap;
use symset_rs::memory::{MutableMemory, RegionId, SetMemory};
use symset_rs::model::{Interpretation, Model, ModelEvaluator};
use symset_rs::types::{Address, Sort};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Elements of the set of #1.
    #[arg(long, value_name = "INT", value_delimiter = ',', default_value = "1,2,3")]
    first: Vec<i64>,

    /// Elements of the set of #2.
    #[arg(long, value_name = "INT", value_delimiter = ',', default_value = "2,3,4")]
    second: Vec<i64>,

    /// Merge the unconstrained set of a symbolic reference `r` into #1 under guard `g`.
    #[clap(long)]
    symbolic: bool,

    /// Heap size (in bits).
    #[clap(long, value_name = "INT", default_value = "16")]
    size: usize,

    /// Print the update-log graph in DOT format.
    #[clap(long)]
    dot: bool,

    /// Enable debug logging.
    #[clap(long)]
    debug: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Cli::parse();

    simplelog::TermLogger::init(
        if args.debug {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    println!("args = {:?}", args);

    let heap = Heap::new(args.size);
    let terms = heap.terms();
    let ints = RegionId::new(Sort::Int);
    let a = terms.mk_addr(Address::new(1));
    let b = terms.mk_addr(Address::new(2));

    let mut memory = SetMemory::new();
    let mut region = memory.get_region(ints);
    for &x in &args.first {
        region.write(&heap, a, terms.mk_int(x), terms.mk_true(), terms.mk_true());
    }
    for &x in &args.second {
        region.write(&heap, b, terms.mk_int(x), terms.mk_true(), terms.mk_true());
    }
    let r = terms.mk_var("r", Sort::Addr);
    let g = terms.mk_var("g", Sort::Bool);
    if args.symbolic {
        region.union(&heap, r, a, g);
    }
    memory.set_region(ints, region.clone());

    println!("\nReads:");
    let candidates: Vec<i64> = {
        let mut xs: Vec<i64> = args.first.iter().chain(&args.second).copied().collect();
        xs.sort_unstable();
        xs.dedup();
        xs
    };
    let mut assertions = Vec::new();
    for &x in &candidates {
        let e = terms.mk_int(x);
        let in_a = region.read(&heap, a, e, None);
        let in_b = region.read(&heap, b, e, None);
        println!("  {} ∈ #1 = {}, {} ∈ #2 = {}", x, terms.to_sexpr(in_a), x, terms.to_sexpr(in_b));
        assertions.push(in_a);
    }

    let s1 = region.allocated(Address::new(1));
    let s2 = region.allocated(Address::new(2));
    println!("\nRegions:");
    println!("  #1: {}", heap.region(s1));
    println!("  #2: {}", heap.region(s2));

    let model = Model::new()
        .assign("g", true)
        .assign("r", Address::new(7))
        .with_contains(Interpretation::new(false).with(Address::new(7), candidates.first().copied().unwrap_or(0), true))
        .rename(Address::new(7), Address::new(3));

    let symbolic = heap.intersection_size(&memory, ints, a, b, &Model::new());
    let solved = heap.intersection_size(&memory, ints, a, b, &model);
    println!("\n|#1 ∩ #2| = {}", terms.to_sexpr(symbolic));
    println!("|#1 ∩ #2| under model = {}", terms.to_sexpr(model.eval(terms, solved, true)));

    if args.dot {
        println!("\n{}", heap.to_dot(&[s1, s2])?);
    }

    let entries = heap.decode(&model, &assertions);
    println!("\nDecoded ({} entries, default {}):", entries.len(), entries.default_value());
    for ((owner, element), member) in entries.iter() {
        println!("  {}[{}] = {}", owner, element, member);
    }

    println!("\n{}", heap.stats());
    Ok(())
}
