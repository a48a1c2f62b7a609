use std::env;
use std::fs;
use std::path::Path;

fn main() {
    // Create config template if it doesn't exist
    let out_dir = env::var("OUT_DIR").unwrap_or_else(|_| "./".to_string());
    let template_path = Path::new(&out_dir).join("../../../tsmux.conf.template");

    let template = r#"# tsmux configuration template
# Copy this file to 'tsmux.conf' and adjust. Every key is optional.

# generic, atsc, cablelabs, dvb, bluray or isdb
ts_type = "generic"

# Multiplex rate in bits per second
mux_rate = 10000000

transport_stream_id = 1

# network_pid = 16

pat_period = 0.1
pcr_period = 0.035
start_delay = 0.5
"#;

    let _ = fs::write(template_path, template);
    println!("cargo:rerun-if-changed=build.rs");
}
