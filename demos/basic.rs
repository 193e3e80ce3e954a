use discord_rest_http::{Dispatcher, FileAttachment, RequestOptions, RequestSpec, RestError};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let channel_id = std::env::var("DISCORD_CHANNEL_ID")?;
    let dispatcher = Dispatcher::from_env().map_err(anyhow::Error::msg)?;

    let me = RequestSpec::get("/users/@me", RequestOptions::new().route("/users/@me"));
    let response = dispatcher.send(&me, 0).await?;
    println!("{}", response.text().await?);

    let upload = RequestSpec::post(
        format!("/channels/{channel_id}/messages"),
        RequestOptions::new()
            .route(format!("/channels/{channel_id}/messages"))
            .data(&json!({ "content": "hello from discord-rest-http" }))?
            .file(FileAttachment::new("files[0]", b"hello".to_vec()).filename("hello.txt")),
    );

    // Minimal retry driver: later attempts go to the canonical API.
    let mut attempt = 0;
    let response = loop {
        match dispatcher.send(&upload, attempt).await {
            Ok(response) => break response,
            Err(err) if attempt < 2 && !matches!(err, RestError::Construction(_)) => {
                eprintln!("attempt {attempt} failed: {err}");
                attempt += 1;
            }
            Err(err) => return Err(err.into()),
        }
    };
    println!("{}", response.status());

    Ok(())
}
