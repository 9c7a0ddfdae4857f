//! MAVLink frame builders.
//!
//! Stateless translations from high-level intents to protocol frames. The
//! session supplies target addressing and boot-relative timestamps; nothing
//! here touches shared state.

use mavlink::ardupilotmega::{
    AttitudeTargetTypemask, MavCmd, MavFrame, MavMessage, PositionTargetTypemask,
    COMMAND_LONG_DATA, MANUAL_CONTROL_DATA, SET_ATTITUDE_TARGET_DATA,
    SET_POSITION_TARGET_GLOBAL_INT_DATA,
};

use crate::transport::MavTarget;

/// Signed manual-control stick values: x=forward, y=right, z=down.
///
/// Yaw and button state are always zero in this design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManualAxes {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl ManualAxes {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Map a movement direction to signed axis values.
///
/// Unrecognized directions yield all-zero axes; the resulting frame is a
/// harmless no-op rather than an error.
pub fn axes_for_direction(direction: &str, throttle: f32) -> ManualAxes {
    let t = throttle.clamp(-1000.0, 1000.0) as i16;
    match direction {
        "up" => ManualAxes { z: -t, ..Default::default() },
        "down" => ManualAxes { z: t, ..Default::default() },
        "left" => ManualAxes { y: -t, ..Default::default() },
        "right" => ManualAxes { y: t, ..Default::default() },
        "forward" => ManualAxes { x: t, ..Default::default() },
        "backward" => ManualAxes { x: -t, ..Default::default() },
        _ => ManualAxes::default(),
    }
}

/// MAV_CMD_COMPONENT_ARM_DISARM with param1=1 (arm).
pub fn arm_command(target: MavTarget) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system: target.system,
        target_component: target.component,
        command: MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
        confirmation: 0,
        param1: 1.0, // 1 = arm
        param2: 0.0,
        param3: 0.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
    })
}

/// MAV_CMD_DO_SET_MODE with the custom-mode flag and the given mode code.
pub fn set_mode_command(target: MavTarget, mode_code: u32) -> MavMessage {
    MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
        target_system: target.system,
        target_component: target.component,
        command: MavCmd::MAV_CMD_DO_SET_MODE,
        confirmation: 0,
        param1: 1.0, // MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
        param2: mode_code as f32,
        param3: 0.0,
        param4: 0.0,
        param5: 0.0,
        param6: 0.0,
        param7: 0.0,
    })
}

/// MANUAL_CONTROL carrying raw stick-equivalent axis values.
pub fn manual_control(target: MavTarget, axes: ManualAxes) -> MavMessage {
    MavMessage::MANUAL_CONTROL(MANUAL_CONTROL_DATA {
        target: target.system,
        x: axes.x,
        y: axes.y,
        z: axes.z,
        r: 0,
        buttons: 0,
    })
}

/// SET_POSITION_TARGET_GLOBAL_INT with every field except Z masked out,
/// leaving only the depth setpoint active.
pub fn depth_target(time_boot_ms: u32, target: MavTarget, depth_m: f32) -> MavMessage {
    MavMessage::SET_POSITION_TARGET_GLOBAL_INT(SET_POSITION_TARGET_GLOBAL_INT_DATA {
        time_boot_ms,
        target_system: target.system,
        target_component: target.component,
        coordinate_frame: MavFrame::MAV_FRAME_GLOBAL_INT,
        type_mask: PositionTargetTypemask::POSITION_TARGET_TYPEMASK_X_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_Y_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VY_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VZ_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AX_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AY_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AZ_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_RATE_IGNORE,
        lat_int: 0,
        lon_int: 0,
        alt: depth_m,
        vx: 0.0,
        vy: 0.0,
        vz: 0.0,
        afx: 0.0,
        afy: 0.0,
        afz: 0.0,
        yaw: 0.0,
        yaw_rate: 0.0,
    })
}

/// SET_ATTITUDE_TARGET from Euler angles in degrees.
///
/// Throttle is masked out so the depth-hold controller keeps it; body rates
/// and thrust are zero.
pub fn attitude_target(
    time_boot_ms: u32,
    target: MavTarget,
    roll_deg: f32,
    pitch_deg: f32,
    yaw_deg: f32,
) -> MavMessage {
    MavMessage::SET_ATTITUDE_TARGET(SET_ATTITUDE_TARGET_DATA {
        time_boot_ms,
        target_system: target.system,
        target_component: target.component,
        type_mask: AttitudeTargetTypemask::ATTITUDE_TARGET_TYPEMASK_THROTTLE_IGNORE,
        q: euler_to_quaternion(
            roll_deg.to_radians(),
            pitch_deg.to_radians(),
            yaw_deg.to_radians(),
        ),
        body_roll_rate: 0.0,
        body_pitch_rate: 0.0,
        body_yaw_rate: 0.0,
        thrust: 0.0,
    })
}

/// Attitude quaternion (w, x, y, z) from roll/pitch/yaw in radians,
/// aerospace ZYX rotation order. Zero rotation is (1, 0, 0, 0).
pub fn euler_to_quaternion(roll: f32, pitch: f32, yaw: f32) -> [f32; 4] {
    let (sr, cr) = (roll * 0.5).sin_cos();
    let (sp, cp) = (pitch * 0.5).sin_cos();
    let (sy, cy) = (yaw * 0.5).sin_cos();

    [
        cr * cp * cy + sr * sp * sy,
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
    ]
}
