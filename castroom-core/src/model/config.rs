use serde::{Deserialize, Serialize};

/// STUN servers used for NAT traversal, identical on host and viewer.
pub const STUN_SERVERS: [&str; 5] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

pub const ICE_CANDIDATE_POOL_SIZE: u8 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundlePolicy {
    Balanced,
    MaxBundle,
    MaxCompat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtcpMuxPolicy {
    Negotiate,
    Require,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpSemantics {
    PlanB,
    UnifiedPlan,
}

/// Fixed configuration handed to the broker when opening an identity
/// session. Host and viewer use the same values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub ice_candidate_pool_size: u8,
    pub bundle_policy: BundlePolicy,
    pub rtcp_mux_policy: RtcpMuxPolicy,
    pub sdp_semantics: SdpSemantics,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            ice_servers: STUN_SERVERS
                .iter()
                .map(|url| IceServerConfig {
                    urls: vec![url.to_string()],
                    username: None,
                    credential: None,
                })
                .collect(),
            ice_candidate_pool_size: ICE_CANDIDATE_POOL_SIZE,
            bundle_policy: BundlePolicy::MaxBundle,
            rtcp_mux_policy: RtcpMuxPolicy::Require,
            sdp_semantics: SdpSemantics::UnifiedPlan,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use webrtc::ice_transport::ice_server::RTCIceServer;
    use webrtc::peer_connection::configuration::RTCConfiguration;
    use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
    use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;

    use super::{BrokerConfig, BundlePolicy, RtcpMuxPolicy};

    impl From<&BrokerConfig> for RTCConfiguration {
        fn from(config: &BrokerConfig) -> Self {
            RTCConfiguration {
                ice_servers: config
                    .ice_servers
                    .iter()
                    .map(|server| RTCIceServer {
                        urls: server.urls.clone(),
                        username: server.username.clone().unwrap_or_default(),
                        credential: server.credential.clone().unwrap_or_default(),
                    })
                    .collect(),
                ice_candidate_pool_size: config.ice_candidate_pool_size,
                bundle_policy: match config.bundle_policy {
                    BundlePolicy::Balanced => RTCBundlePolicy::Balanced,
                    BundlePolicy::MaxBundle => RTCBundlePolicy::MaxBundle,
                    BundlePolicy::MaxCompat => RTCBundlePolicy::MaxCompat,
                },
                rtcp_mux_policy: match config.rtcp_mux_policy {
                    RtcpMuxPolicy::Negotiate => RTCRtcpMuxPolicy::Negotiate,
                    RtcpMuxPolicy::Require => RTCRtcpMuxPolicy::Require,
                },
                ..Default::default()
            }
        }
    }
}
