use reel_tuner::cli;

fn main() {
    env_logger::init();
    cli::run();
}
