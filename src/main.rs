//! LG TV Firmware Downgrader - webOS 固件降级工具
//!
//! Usage:
//! - Wizard mode (default): `lgtv-downgrader`
//! - Find firmware: `lgtv-downgrader --model LG-43UP75006LF --firmware 03.21.30 --find-firmware`
//! - Prepare USB: `lgtv-downgrader --model LG-43UP75006LF --firmware 03.21.30 --usb /media/usb`
//! - Send SSH command: `lgtv-downgrader --ip 192.168.1.100 --send-command`
//! - Scan LAN: `lgtv-downgrader --scan`

use lgtv_downgrader::{Action, RuntimeConfig};

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();
    let mut usb_action = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--model" if i + 1 < args.len() => {
                config.model = Some(args[i + 1].clone());
                i += 2;
            }
            "--firmware" if i + 1 < args.len() => {
                config.firmware = Some(args[i + 1].clone());
                i += 2;
            }
            "--usb" if i + 1 < args.len() => {
                config.usb_path = Some(args[i + 1].clone());
                usb_action = true;
                i += 2;
            }
            "--ip" if i + 1 < args.len() => {
                config.tv_ip = Some(args[i + 1].clone());
                i += 2;
            }
            "--find-firmware" => {
                config.action = Action::FindFirmware;
                i += 1;
            }
            "--send-command" => {
                config.action = Action::SendCommand;
                i += 1;
            }
            "--scan" => {
                config.action = Action::Scan;
                i += 1;
            }
            "--wizard" => {
                config.action = Action::Wizard;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    // --usb 本身就是一个动作，除非已指定其他动作
    if usb_action && config.action == Action::Wizard {
        config.action = Action::PrepareUsb;
    }

    config
}

fn print_help() {
    println!("LG TV Firmware Downgrader - webOS 固件降级工具");
    println!();
    println!("USAGE:");
    println!("    lgtv-downgrader [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --model <MODEL>        TV model number (e.g. LG-43UP75006LF)");
    println!("    --firmware <VERSION>   Target firmware version (e.g. 03.21.30)");
    println!("    --usb <PATH>           USB drive path (e.g. /media/usb or E:)");
    println!("    --ip <IP>              TV IP address for SSH");
    println!("    --find-firmware        Find firmware in the local cache only");
    println!("    --send-command         Send the downgrade command via SSH");
    println!("    --scan                 Scan the local /24 for reachable TVs");
    println!("    --wizard               Run the interactive wizard (default)");
    println!("    -h, --help             Print help information");
    println!();
    println!("EXAMPLES:");
    println!("    lgtv-downgrader                                     # Interactive wizard");
    println!("    lgtv-downgrader --model LG-43UP75006LF --firmware 03.21.30 --find-firmware");
    println!("    lgtv-downgrader --model LG-43UP75006LF --firmware 03.21.30 --usb /media/usb");
    println!("    lgtv-downgrader --ip 192.168.1.100 --send-command");
}

fn main() {
    let config = parse_args();

    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let result = rt.block_on(async { lgtv_downgrader::init_and_run(config).await });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
