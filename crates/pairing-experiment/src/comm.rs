//! Hello handshake between a beam and a vehicle.
//!
//! The beam sends a hello on the downlink; the vehicle answers on the
//! uplink. Both directions must be detected. The CQI of the link is the
//! received power (dBm) of the hello-reply measured at the beam.

use mmwave_sim::channel::Channel;
use rand::Rng;

use crate::nodes::{Beam, Vehicle};

/// Run the two-way hello handshake.
///
/// Returns the CQI (hello-reply received power in dBm) when both
/// directions succeed, `None` otherwise.
pub fn hello(beam: &Beam, vehicle: &Vehicle, channel: &Channel, rng: &mut impl Rng) -> Option<f64> {
    let beam_pos = beam.location;
    let vehicle_pos = vehicle.position();

    // Downlink hello
    mmwave_sim::radio::transmit(&beam.radio, &beam_pos, &vehicle.radio, &vehicle_pos, channel, rng)?;

    // Uplink hello-reply; its received power is the CQI
    mmwave_sim::radio::transmit(&vehicle.radio, &vehicle_pos, &beam.radio, &beam_pos, channel, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmwave_sim::geometry::Point;
    use mmwave_sim::mobility::PathMobility;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn vehicle_at(p: Point) -> Vehicle {
        Vehicle::new("Car 0".to_string(), PathMobility::new(vec![p], 10.0))
    }

    #[test]
    fn test_hello_succeeds_in_sector() {
        let beam = Beam::sector("BS-01".to_string(), Point::new(0.0, 0.0), 0.0, 60.0);
        let vehicle = vehicle_at(Point::new(0.0, 250.0));
        let ch = Channel::mmwave_28ghz();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let cqi = hello(&beam, &vehicle, &ch, &mut rng);
        assert!(cqi.is_some());
        // CQI is the uplink received power and must clear the beam's
        // sensitivity.
        assert!(cqi.unwrap() >= beam.radio.config.sensitivity_dbm());
    }

    #[test]
    fn test_hello_fails_outside_sector() {
        let beam = Beam::sector("BS-01".to_string(), Point::new(0.0, 0.0), 0.0, 60.0);
        // Due south of a north-facing beam, well out of the main lobe
        let vehicle = vehicle_at(Point::new(0.0, -600.0));
        let ch = Channel::mmwave_28ghz();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(hello(&beam, &vehicle, &ch, &mut rng).is_none());
    }

    #[test]
    fn test_hello_fails_out_of_range() {
        let beam = Beam::sector("BS-01".to_string(), Point::new(0.0, 0.0), 0.0, 60.0);
        let vehicle = vehicle_at(Point::new(0.0, 3_000.0));
        let ch = Channel::mmwave_28ghz();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        assert!(hello(&beam, &vehicle, &ch, &mut rng).is_none());
    }

    #[test]
    fn test_cqi_decreases_with_range() {
        let beam = Beam::sector("BS-01".to_string(), Point::new(0.0, 0.0), 0.0, 60.0);
        let ch = Channel::mmwave_28ghz();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let near = hello(&beam, &vehicle_at(Point::new(0.0, 100.0)), &ch, &mut rng).unwrap();
        let far = hello(&beam, &vehicle_at(Point::new(0.0, 400.0)), &ch, &mut rng).unwrap();
        assert!(near > far);
    }
}
