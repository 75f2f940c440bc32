mod failure_modes;
mod roundtrip_props;
