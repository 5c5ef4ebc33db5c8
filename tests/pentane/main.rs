mod properties;
mod reference_state;
mod state_creation;
mod vle_pure;
