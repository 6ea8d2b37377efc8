mod object_pack;
pub use self::object_pack::*;

mod prepared_triangle;
pub use self::prepared_triangle::*;

mod prepared_sphere;
pub use self::prepared_sphere::*;

mod prepared_instance;
pub use self::prepared_instance::*;

mod prepared_pack;
pub use self::prepared_pack::*;

mod prepared_scene;
pub use self::prepared_scene::*;

mod profile;
pub use self::profile::*;
