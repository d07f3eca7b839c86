use timbre_analysis::Config;
use timbre_service::TimbreService;

pub fn show_status(service: &TimbreService, config: &Config) {
    let status = service.index_status();

    println!("\n📊 Timbre Status\n");
    println!("  Index: {}", service.index().root().display());
    println!("  Built: {}", if status.built { "yes" } else { "no" });
    if let Some(dimension) = status.dimension {
        println!("  Dimension: {}", dimension);
    }
    println!("  Items: {}", status.item_count);
    println!("  Default depth: {}", config.default_depth);
    println!("  Service port: {}", config.listen_port);

    if !status.built {
        println!("\n  Run `timbre index <dir>` to build the index");
    }
}
