use flightplan_kinematics::hardware::{DescriptionCatalog, HardwareConfiguration};
use flightplan_kinematics::kinematics::{GimbalStateVector, KinematicsProvider, SnapPointId};
use flightplan_kinematics::{Ecef, Orientation, Wgs84};
use uom::si::angle::degree;
use uom::si::f64::Angle;

const CONFIGURATION: &str = "
platform_id: SurveyQuad
gnss_antenna_id: RearMast
payload_mounts:
  - description_id: TwoAxisGimbal
    payloads:
      - description_id: Mapper24
        payload_snap_point_id: CameraPlate
        lens:
          description_id: Mapper24Lens
";

fn main() {
    let catalog: DescriptionCatalog =
        serde_yaml::from_str(include_str!("hardware.yaml")).expect("catalog is valid YAML");
    let config: HardwareConfiguration =
        serde_yaml::from_str(CONFIGURATION).expect("configuration is valid YAML");

    let provider = KinematicsProvider::new(catalog);
    let payload = provider
        .get_or_create_payload_kinematic_chain(&config, 0, 0)
        .expect("configuration matches the catalog");

    // where the autopilot says the antenna is, and how the drone is oriented
    let antenna_at = Wgs84::from_degrees_and_meters(52.5163, 13.3777, 120.)
        .expect("latitude is in [-90°, 90°]");
    let heading_north_east = Orientation::from_tait_bryan_angles(
        Angle::new::<degree>(45.),
        Angle::new::<degree>(-4.),
        Angle::new::<degree>(1.5),
    );

    // sweep the camera from straight ahead to straight down
    for pitch in [0., -30., -60., -90.] {
        let state = payload
            .chain()
            .create_state(GimbalStateVector::from_degrees(&[0., pitch]))
            .expect("one angle per gimbal joint");
        let offset = provider
            .earth_frame_offset(
                &state,
                &SnapPointId::GNSS_ANTENNA,
                &heading_north_east,
                payload.nodal_point_id(),
            )
            .expect("antenna and camera are on the same drone");
        let nodal_point_at = provider
            .transform_wgs84_position(
                &state,
                &SnapPointId::GNSS_ANTENNA,
                &heading_north_east,
                &antenna_at,
                payload.nodal_point_id(),
            )
            .expect("antenna and camera are on the same drone");

        let separation = Ecef::from(nodal_point_at).to_nalgebra_point()
            - Ecef::from(antenna_at).to_nalgebra_point();
        println!(
            "gimbal pitch {pitch:>5.1}°: camera at {nodal_point_at} \
             ({:.3}m north, {:.3}m east, {:.3}m below the antenna)",
            offset.x, offset.y, offset.z,
        );

        // the camera always hangs below the antenna and stays within arm's reach of it
        assert!(offset.z > 0.);
        assert!((separation.norm() - offset.norm()).abs() < 1e-6);
        assert!(separation.norm() < 1.);
    }
}
