use anyhow::Context;

fn main() -> anyhow::Result<()> {
    video_booth_lib::run().context("video booth terminated with an error")
}
