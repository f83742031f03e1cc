pub mod hand_landmarker;
