use vercel_runtime::{run, Body, Error, Request, Response};

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::telemetry::init();
    shared::services()?;
    run(handler).await
}

pub async fn handler(req: Request) -> Result<Response<Body>, Error> {
    shared::dispatch(req, shared::handlers::orders::handle).await
}
