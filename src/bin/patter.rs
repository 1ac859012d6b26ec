// Patter command-line driver: thin wrapper over the shared cli module.
// Usage: cargo run --bin patter -- <compile|tokens|tree|functions> [file]

fn main() {
    patter::cli::run();
}
