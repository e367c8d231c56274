mod collection_round_trip;
mod color_diffusion;
mod hole_filling;
mod island_splitting;
mod shapes;
