use clap::Parser;
use hop_prim::HopScotchCollection;
use hop_prim::HopScotchConfig;
use hop_prim::hashing::DefaultHashFunction;
use hop_prim::hashing::HashFunction;
use hop_prim::table::IntKeyRawTable;
use hop_prim::table::LongKeyRawTable;
use hop_prim::table::Table;
use log::LevelFilter;
use log::Metadata;
use log::Record;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'n', long = "keys", default_value_t = 100_000)]
    keys: usize,

    #[arg(short = 's', long = "stop_after", default_value_t = 1000)]
    stop_after: usize,

    #[arg(short = 'c', long = "initial_capacity", default_value_t = 1024)]
    initial_capacity: usize,

    #[arg(long = "neighborhood", default_value_t = 32)]
    neighborhood: usize,

    /// Store keys in a 4-byte key table.
    #[arg(long = "int_keys")]
    int_keys: bool,

    /// Print growth and traversal events.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn run<T: Table<Value = ()>, S: HashFunction + Default>(args: &Args) {
    let config = HopScotchConfig::default()
        .initial_capacity(args.initial_capacity)
        .neighborhood(args.neighborhood)
        .diagnostics(true);
    let mut set: HopScotchCollection<T, S> = match HopScotchCollection::with_config(config, ()) {
        Ok(set) => set,
        Err(err) => {
            eprintln!("invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    println!("Inserting {} random keys...", args.keys);
    let mut rng = SmallRng::from_os_rng();
    while set.len() < args.keys {
        set.insert(rng.random_range(0..i64::from(i32::MAX)));
    }

    set.debug_stats().print();
    let hist = set.probe_histogram();
    println!("Probe distance histogram:");
    for (distance, count) in hist.iter().enumerate().filter(|(_, count)| **count != 0) {
        println!("  {distance:>2}: {count}");
    }

    let mut visited = 0;
    let stopped = set.visit_keys(|_| {
        visited += 1;
        visited == args.stop_after
    });
    println!("Visitor stopped early: {stopped} after {visited} keys");
    if let Some(stats) = set.visit_statistics() {
        println!("{stats}");
    }

    set.visit_keys(|_| false);
    if let Some(stats) = set.visit_statistics() {
        println!("{stats}");
    }
}

fn main() {
    let args = Args::parse();

    if args.verbose && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }

    if args.int_keys {
        run::<IntKeyRawTable<()>, DefaultHashFunction>(&args);
    } else {
        run::<LongKeyRawTable<()>, DefaultHashFunction>(&args);
    }
}
