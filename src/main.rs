// 家庭物资清单 - 终端入口

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = family_ration_lib::run().await {
        eprintln!("family-ration: {:#}", e);
        std::process::exit(1);
    }
}
