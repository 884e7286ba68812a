fn main() {
    // Templates are embedded with include_dir!, which cargo doesn't track.
    println!("cargo:rerun-if-changed=assets/templates");
}
