use tilt_testserver::{logging, RequestLogger, Server, DEFAULT_ADDR};

fn main() -> std::io::Result<()> {
    logging::init_tracing();

    Server::bind(DEFAULT_ADDR)?.serve(RequestLogger::stdout())
}
