// The consensus context a step runs in.
//
// `Ruleset` bundles the `GameConfig` (fork heights and constants) with the
// immutable `GameMap`. Everything that needs consensus parameters takes a
// `&Ruleset`; there is no global state.

use crate::config::GameConfig;
use crate::map::GameMap;

#[derive(Clone, Debug)]
pub struct Ruleset {
    pub config: GameConfig,
    pub map: GameMap,
}

impl Ruleset {
    pub fn new(config: GameConfig, map: GameMap) -> Self {
        Self { config, map }
    }

    /// Mainnet fork heights on the standard map.
    pub fn mainnet() -> Self {
        Self::new(GameConfig::mainnet(), GameMap::standard())
    }
}
