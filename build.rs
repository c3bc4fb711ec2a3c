use cfg_aliases::cfg_aliases;

fn main() {
    cfg_aliases! {
        wasm: { target_arch = "wasm32" },
        sw: { wasm },
        host: { not(wasm) },
        debug: { debug_assertions },
        release: { not(debug_assertions) },
    }
}
