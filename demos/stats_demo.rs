use clap::Parser;
use probe_map::LinkedHashMap;
use probe_map::config::DEFAULT_INITIAL_SIZE;
use probe_map::config::TableConfig;
use probe_map::strategy::DefaultStrategy;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    #[arg(short = 'l', long = "load_factor", default_value_t = 0.75)]
    load_factor: f32,
}

fn print_histogram(histogram: &[usize]) {
    println!("Probe length histogram:");
    let total: usize = histogram.iter().sum();
    for (distance, count) in histogram.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        println!(
            "  {:>3}: {:>8} ({:.02}%)",
            distance,
            count,
            *count as f64 / total as f64 * 100.0
        );
    }
}

fn main() {
    let args = Args::parse();

    let config = match TableConfig::new(DEFAULT_INITIAL_SIZE, args.load_factor) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(1);
        }
    };
    let mut map: LinkedHashMap<u64, u64, DefaultStrategy> =
        match LinkedHashMap::with_config(config, DefaultStrategy::default()) {
            Ok(map) => map,
            Err(err) => {
                eprintln!("Could not build map: {err}");
                std::process::exit(1);
            }
        };

    println!("Created map at load factor {}", args.load_factor);
    println!("Initial slot count: {}", map.capacity());
    println!("Filling map with {} u64 keys...", args.target_capacity);

    for key in 0..args.target_capacity as u64 {
        map.insert(key, key);
    }

    println!("Inserted {} entries", map.len());
    println!(
        "Occupancy: {:.2}%",
        (map.len() as f64 / map.capacity() as f64) * 100.0
    );
    print_histogram(&map.probe_histogram());
    map.debug_stats().print();

    // Popping from the front keeps the newest keys.
    println!("Evicting oldest entries...");
    let keep = args.target_capacity / 10;
    let before = map.capacity();
    while map.len() > keep {
        if map.pop_first().is_none() {
            break;
        }
    }

    println!(
        "Kept {} entries, slot count {} -> {}",
        map.len(),
        before,
        map.capacity()
    );
    if let Some((key, _)) = map.first() {
        println!("Oldest remaining key: {key}");
    }
    print_histogram(&map.probe_histogram());
    map.debug_stats().print();
}
