//! Request routing for hosts that carry [`CsiMessage`] envelopes.
//!
//! The host owns the transport (gRPC, QUIC, a unix socket...) and hands each
//! decoded request to [`dispatch`], one task per request.

use tracing::{debug, warn};

use crate::controller::CsiController;
use crate::error::CsiError;
use crate::identity::CsiIdentity;
use crate::message::CsiMessage;
use crate::node::CsiNode;

/// Map a [`CsiMessage`] request to the correct trait method call and wrap
/// the result in a response [`CsiMessage`].
pub async fn dispatch<T>(handler: &T, request: CsiMessage) -> CsiMessage
where
    T: CsiIdentity + CsiController + CsiNode,
{
    debug!(%request, "CSI request received");
    let response = match request {
        // --- Identity -------------------------------------------------------
        CsiMessage::Probe => match handler.probe().await {
            Ok(ok) => CsiMessage::ProbeResult(ok),
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::GetPluginInfo => match handler.get_plugin_info().await {
            Ok(info) => CsiMessage::PluginInfoResponse(info),
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::GetPluginCapabilities => match handler.get_plugin_capabilities().await {
            Ok(caps) => CsiMessage::PluginCapabilitiesResponse(caps),
            Err(e) => CsiMessage::Error(e),
        },

        // --- Controller -----------------------------------------------------
        CsiMessage::CreateVolume(req) => match handler.create_volume(req).await {
            Ok(vol) => CsiMessage::VolumeCreated(vol),
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::DeleteVolume(id) => match handler.delete_volume(&id).await {
            Ok(()) => CsiMessage::Ok,
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::ValidateVolumeCapabilities {
            volume_id,
            capabilities,
        } => match handler
            .validate_volume_capabilities(&volume_id, &capabilities)
            .await
        {
            Ok(valid) => CsiMessage::CapabilitiesValid(valid),
            Err(e) => CsiMessage::Error(e),
        },

        // --- Node -----------------------------------------------------------
        CsiMessage::StageVolume(req) => match handler.stage_volume(req).await {
            Ok(()) => CsiMessage::Ok,
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::UnstageVolume {
            volume_id,
            staging_target_path,
        } => match handler
            .unstage_volume(&volume_id, &staging_target_path)
            .await
        {
            Ok(()) => CsiMessage::Ok,
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::PublishVolume(req) => match handler.publish_volume(req).await {
            Ok(()) => CsiMessage::Ok,
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::UnpublishVolume {
            volume_id,
            target_path,
        } => match handler.unpublish_volume(&volume_id, &target_path).await {
            Ok(()) => CsiMessage::Ok,
            Err(e) => CsiMessage::Error(e),
        },
        CsiMessage::GetNodeInfo => match handler.get_info().await {
            Ok(info) => CsiMessage::NodeInfoResponse(info),
            Err(e) => CsiMessage::Error(e),
        },

        // --- Response variants should never arrive as requests --------------
        other => {
            warn!(msg = %other, "unexpected message variant received as request");
            CsiMessage::Error(CsiError::InvalidArgument(format!(
                "unexpected message: {other}"
            )))
        }
    };
    if let CsiMessage::Error(e) = &response {
        warn!(error = %e, code = ?e.code(), "CSI request failed");
    }
    response
}
