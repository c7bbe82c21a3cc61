use rand::Rng;

pub struct RuinContext<'a, R>
where
    R: Rng,
{
    pub rng: &'a mut R,
    pub num_nodes_to_remove: usize,
    pub relation_nesting_limit: usize,
}
