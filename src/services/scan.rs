//! 局域网扫描服务
//!
//! 对本地 /24 网段做 TCP 探测，寻找开放了 Developer Mode SSH 端口的 TV。
//! 探测是有界并发的（信号量限流），支持取消令牌提前终止

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::env::ScanConfig;
use crate::domain::device::DiscoveredTv;

/// 探测单个地址的 TCP 端口是否可连
pub async fn probe_host(ip: IpAddr, port: u16, timeout: Duration) -> bool {
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect((ip, port))).await,
        Ok(Ok(_))
    )
}

/// 检测本机局域网 IP
///
/// 通过向公网地址"连接" UDP socket 读取内核选择的源地址，
/// 不会真的发包；失败时在 Linux 上回退到 `hostname -I`
pub fn detect_local_ip() -> Option<Ipv4Addr> {
    if let Ok(socket) = std::net::UdpSocket::bind("0.0.0.0:0") {
        if socket.connect("8.8.8.8:80").is_ok() {
            if let Ok(std::net::SocketAddr::V4(addr)) = socket.local_addr() {
                return Some(*addr.ip());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(output) = std::process::Command::new("hostname").arg("-I").output() {
            if output.status.success() {
                let stdout = String::from_utf8_lossy(&output.stdout);
                for token in stdout.split_whitespace() {
                    if let Ok(ip) = token.parse::<Ipv4Addr>() {
                        if is_private_ip(ip) {
                            return Some(ip);
                        }
                    }
                }
            }
        }
    }

    None
}

/// 检查是否为私有地址 (10/8, 172.16/12, 192.168/16)
pub fn is_private_ip(ip: Ipv4Addr) -> bool {
    let octets = ip.octets();

    if octets[0] == 10 {
        return true;
    }
    if octets[0] == 172 && (16..=31).contains(&octets[1]) {
        return true;
    }
    if octets[0] == 192 && octets[1] == 168 {
        return true;
    }

    false
}

/// 网段扫描器
pub struct NetworkScanner {
    config: ScanConfig,
    port: u16,
}

impl NetworkScanner {
    pub fn new(config: ScanConfig, port: u16) -> Self {
        Self { config, port }
    }

    /// 扫描整个 /24 网段，返回去重排序后的结果
    pub async fn sweep(&self, local_ip: Ipv4Addr, cancel: CancellationToken) -> Vec<DiscoveredTv> {
        let started = Instant::now();
        let mut set = self.spawn_probes(local_ip, &cancel);

        let mut found = Vec::new();
        while let Some(result) = set.join_next().await {
            if let Ok(Some(tv)) = result {
                info!(ip = %tv.ip, "Found reachable TV");
                found.push(tv);
            }
        }

        found.sort_by_key(|tv| tv.ip);
        found.dedup_by_key(|tv| tv.ip);

        info!(
            found = found.len(),
            elapsed_secs = started.elapsed().as_secs(),
            "Network sweep complete"
        );
        found
    }

    /// 扫描到第一台可达的 TV 就取消剩余探测
    pub async fn find_first(&self, local_ip: Ipv4Addr) -> Option<DiscoveredTv> {
        let cancel = CancellationToken::new();
        let mut set = self.spawn_probes(local_ip, &cancel);

        while let Some(result) = set.join_next().await {
            if let Ok(Some(tv)) = result {
                cancel.cancel();
                set.abort_all();
                info!(ip = %tv.ip, "Found reachable TV, cancelling remaining probes");
                return Some(tv);
            }
        }

        None
    }

    /// 对 /24 内的每个主机地址各起一个探测任务，信号量限流
    fn spawn_probes(
        &self,
        local_ip: Ipv4Addr,
        cancel: &CancellationToken,
    ) -> JoinSet<Option<DiscoveredTv>> {
        let [a, b, c, _] = local_ip.octets();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let probe_timeout = Duration::from_secs(self.config.probe_timeout_secs);
        let port = self.port;

        debug!(
            network = %format!("{}.{}.{}.0/24", a, b, c),
            port,
            concurrency = self.config.concurrency,
            "Starting network sweep"
        );

        let mut set = JoinSet::new();
        for host in 1..=254u8 {
            let ip = IpAddr::V4(Ipv4Addr::new(a, b, c, host));
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();

            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                if cancel.is_cancelled() {
                    return None;
                }

                let started = Instant::now();
                tokio::select! {
                    _ = cancel.cancelled() => None,
                    reachable = probe_host(ip, port, probe_timeout) => {
                        reachable.then(|| DiscoveredTv {
                            ip,
                            port,
                            latency_ms: Some(started.elapsed().as_secs_f64() * 1000.0),
                            discovered_at: Utc::now(),
                        })
                    }
                }
            });
        }

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(Ipv4Addr::new(192, 168, 1, 1)));
        assert!(is_private_ip(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_private_ip(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(!is_private_ip(Ipv4Addr::new(172, 32, 0, 1)));
        assert!(!is_private_ip(Ipv4Addr::new(8, 8, 8, 8)));
    }

    #[tokio::test]
    async fn test_probe_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let reachable = probe_host(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_secs(2),
        )
        .await;
        assert!(reachable);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        // 先拿一个端口再关掉 listener，保证端口处于关闭状态
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let started = Instant::now();
        let reachable = probe_host(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            Duration::from_secs(2),
        )
        .await;

        assert!(!reachable);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_find_first_returns_listener_address() {
        // 只绑定 127.0.0.1，网段里其余回环地址都会拒绝连接
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = ScanConfig {
            probe_timeout_secs: 1,
            concurrency: 64,
        };
        let scanner = NetworkScanner::new(config, port);

        let found = scanner.find_first(Ipv4Addr::new(127, 0, 0, 1)).await;
        let tv = found.expect("listener should be discovered");
        assert_eq!(tv.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(tv.port, port);
    }

    #[tokio::test]
    async fn test_sweep_respects_cancellation() {
        let config = ScanConfig {
            probe_timeout_secs: 1,
            concurrency: 8,
        };
        let scanner = NetworkScanner::new(config, 1);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let found = scanner.sweep(Ipv4Addr::new(127, 0, 0, 1), cancel).await;
        assert!(found.is_empty());
    }
}
