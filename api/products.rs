use vercel_runtime::{run, Body, Error, Request, Response};

#[tokio::main]
async fn main() -> Result<(), Error> {
    shared::telemetry::init();
    // Fail at cold start rather than on the first request.
    shared::services()?;
    run(handler).await
}

pub async fn handler(req: Request) -> Result<Response<Body>, Error> {
    shared::dispatch(req, shared::handlers::products::handle).await
}
